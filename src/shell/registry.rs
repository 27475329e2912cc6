use super::coerce::{Kind, Value};
use anyhow::{Result, anyhow};
use futures::{FutureExt, future::BoxFuture};
use std::{collections::HashMap, fmt, future::Future, sync::Arc};

/// Aliases that belong to the dispatcher itself
pub const HELP_ALIASES: [&str; 2] = ["help", "h"];

pub const NO_DOCUMENTATION: &str = "no documentation";

/// What the dispatcher should do after a command ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Coerced arguments handed to a handler, one per declared parameter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// # Errors
    ///
    /// Returns an error if the argument is missing or not an integer
    pub fn integer(&self, index: usize) -> Result<i64> {
        match self.get(index) {
            Some(Value::Integer(v)) => Ok(*v),
            other => Err(anyhow!("argument {index} is not an integer: {other:?}")),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the argument is missing or not a float
    pub fn float(&self, index: usize) -> Result<f64> {
        match self.get(index) {
            Some(Value::Float(v)) => Ok(*v),
            other => Err(anyhow!("argument {index} is not a float: {other:?}")),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the argument is missing or not text
    pub fn text(&self, index: usize) -> Result<&str> {
        match self.get(index) {
            Some(Value::Text(v)) => Ok(v.as_str()),
            other => Err(anyhow!("argument {index} is not text: {other:?}")),
        }
    }
}

pub type Handler<C> = Arc<dyn Fn(Arc<C>, Args) -> BoxFuture<'static, Result<Flow>> + Send + Sync>;

/// A named operation the dispatcher can invoke
pub struct Command<C> {
    aliases: Vec<String>,
    params: Vec<Kind>,
    doc: Option<String>,
    hidden: bool,
    handler: Handler<C>,
}

impl<C> Command<C> {
    pub fn new<I, S, H, Fut>(aliases: I, handler: H) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        H: Fn(Arc<C>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow>> + Send + 'static,
    {
        Self {
            aliases: aliases.into_iter().map(Into::into).collect(),
            params: Vec::new(),
            doc: None,
            hidden: false,
            handler: Arc::new(move |ctx, args| handler(ctx, args).boxed()),
        }
    }

    #[must_use]
    pub fn params<I: IntoIterator<Item = Kind>>(mut self, kinds: I) -> Self {
        self.params = kinds.into_iter().collect();
        self
    }

    #[must_use]
    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }

    /// Keep the command out of the help listing, it can still be invoked
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    #[must_use]
    pub fn param_kinds(&self) -> &[Kind] {
        &self.params
    }

    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// First non-empty line of the documentation
    #[must_use]
    pub fn summary(&self) -> &str {
        self.doc
            .as_deref()
            .and_then(|doc| doc.lines().map(str::trim).find(|line| !line.is_empty()))
            .unwrap_or(NO_DOCUMENTATION)
    }

    /// Full documentation with each line trimmed
    #[must_use]
    pub fn documentation(&self) -> String {
        self.doc.as_deref().map_or_else(
            || NO_DOCUMENTATION.to_string(),
            |doc| {
                doc.trim()
                    .lines()
                    .map(str::trim)
                    .collect::<Vec<_>>()
                    .join("\n")
            },
        )
    }

    #[must_use]
    pub fn handler(&self) -> Handler<C> {
        Arc::clone(&self.handler)
    }
}

impl<C> fmt::Debug for Command<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("aliases", &self.aliases)
            .field("params", &self.params)
            .field("hidden", &self.hidden)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("alias {0:?} is already registered")]
    DuplicateAlias(String),
    #[error("alias {0:?} is reserved for help")]
    ReservedAlias(String),
    #[error("a command needs at least one alias")]
    NoAliases,
}

/// Alias table of every command known to the dispatcher
pub struct Registry<C> {
    commands: Vec<Command<C>>,
    index: HashMap<String, usize>,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<C> Registry<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a command under every one of its aliases
    ///
    /// Nothing is stored when any alias is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if an alias is reserved, collides with an existing one,
    /// or the command has no aliases
    pub fn register(&mut self, command: Command<C>) -> Result<(), RegistryError> {
        if command.aliases.is_empty() {
            return Err(RegistryError::NoAliases);
        }

        for (position, alias) in command.aliases.iter().enumerate() {
            if HELP_ALIASES.contains(&alias.as_str()) {
                return Err(RegistryError::ReservedAlias(alias.clone()));
            }
            if self.index.contains_key(alias)
                || command.aliases.iter().take(position).any(|seen| seen == alias)
            {
                return Err(RegistryError::DuplicateAlias(alias.clone()));
            }
        }

        let slot = self.commands.len();
        for alias in &command.aliases {
            self.index.insert(alias.clone(), slot);
        }
        self.commands.push(command);

        Ok(())
    }

    /// Exact, case-sensitive alias lookup
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Command<C>> {
        self.index
            .get(name)
            .and_then(|slot| self.commands.get(*slot))
    }

    /// `(aliases, summary)` in registration order
    #[must_use]
    pub fn list(&self, include_hidden: bool) -> Vec<(&[String], &str)> {
        self.commands
            .iter()
            .filter(|command| include_hidden || !command.hidden)
            .map(|command| (command.aliases(), command.summary()))
            .collect()
    }

    /// Full documentation of the command behind `topic`
    #[must_use]
    pub fn help(&self, topic: &str) -> Option<String> {
        self.resolve(topic).map(Command::documentation)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

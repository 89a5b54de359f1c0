use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("Symbol already defined: {0}")]
    SymbolAlreadyDefined(String),
}

/// A named address or constant.
///
/// Labels come into existence either when they are first referenced, in which case they are
/// unresolved stubs, or when they are first defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Upper-cased name
    pub name: String,
    pub resolved: bool,
    pub address: u16,
    /// Defined through `equ` or `.label` rather than by position
    pub constant: bool,
}

impl Label {
    fn stub(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            resolved: false,
            address: 0,
            constant: false,
        }
    }
}

/// The symbol table is used to resolve labels and constants.
///
/// Owned by a single assembly run. Lookups ignore case.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    labels: Vec<Label>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable { labels: Vec::new() }
    }

    pub fn find(&self, name: &str) -> Option<&Label> {
        self.labels
            .iter()
            .find(|label| label.name.eq_ignore_ascii_case(name))
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Label> {
        self.labels
            .iter_mut()
            .find(|label| label.name.eq_ignore_ascii_case(name))
    }

    /// Look up the address of a label, leaving an unresolved stub behind if it is unknown.
    pub fn reference(&mut self, name: &str) -> Option<u16> {
        match self.find(name) {
            Some(label) if label.resolved => Some(label.address),
            Some(_) => None,
            None => {
                tracing::trace!("New label reference: {}", name);
                self.labels.push(Label::stub(name));
                None
            }
        }
    }

    /// Define a label at an address.
    ///
    /// Resolving a stub keeps it in place. A label that is already resolved stays untouched.
    pub fn define(&mut self, name: &str, address: u16) -> Result<(), SymbolError> {
        self.insert(name, address, false)
    }

    /// Define a label holding a constant value.
    pub fn define_constant(&mut self, name: &str, value: u16) -> Result<(), SymbolError> {
        self.insert(name, value, true)
    }

    fn insert(&mut self, name: &str, address: u16, constant: bool) -> Result<(), SymbolError> {
        match self.find_mut(name) {
            Some(label) if label.resolved => {
                return Err(SymbolError::SymbolAlreadyDefined(label.name.clone()))
            }
            Some(label) => {
                label.resolved = true;
                label.address = address;
                label.constant = constant;
            }
            None => self.labels.push(Label {
                name: name.to_ascii_uppercase(),
                resolved: true,
                address,
                constant,
            }),
        }
        tracing::debug!("Defined {} = {:#06x}", name.to_ascii_uppercase(), address);
        Ok(())
    }

    /// Resolved address labels sitting at `address`, in definition order.
    pub fn labels_at(&self, address: u16) -> impl Iterator<Item = &Label> {
        self.labels
            .iter()
            .filter(move |label| label.resolved && !label.constant && label.address == address)
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter().filter(|label| !label.resolved)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }
}

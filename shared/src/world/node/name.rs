use std::fmt;

use crate::types::ChildId;

/// Debug identity of a node: its base name plus where it sits in the tree
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameParams {
    pub base: String,
    pub id: Option<ChildId>,
    pub parent: Option<String>,
    pub target: Option<String>,
}

impl NameParams {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

impl fmt::Display for NameParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{}/", parent)?;
        }
        write!(f, "{}", self.base)?;
        if let Some(id) = self.id {
            write!(f, "#{}", id)?;
        }
        if let Some(target) = &self.target {
            write!(f, "@{}", target)?;
        }
        Ok(())
    }
}

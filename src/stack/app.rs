//! The application: every stack, plus the region they deploy to.

use indexmap::IndexMap;
use tracing::info;

use super::Stack;
use crate::error::{Error, Result};

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "ap-northeast-2";

/// Root of the declaration tree.
#[derive(Debug)]
pub struct App {
    region: String,
    stacks: IndexMap<String, Stack>,
}

impl Default for App {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}

impl App {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            stacks: IndexMap::new(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Add an empty stack in the app's region.
    pub fn add_stack(&mut self, id: &str) -> Result<&mut Stack> {
        if self.stacks.contains_key(id) {
            return Err(Error::DuplicateConstruct {
                stack: "<app>".to_string(),
                id: id.to_string(),
            });
        }
        // Stacks are never removed, so the count stays unique within the app.
        let ordinal = self.stacks.len() as u64 + 1;
        let stack = Stack::with_ordinal(id, self.region.clone(), ordinal)?;
        info!(stack = id, region = %self.region, "stack added");
        Ok(self.stacks.entry(id.to_string()).or_insert(stack))
    }

    pub fn stack(&self, id: &str) -> Result<&Stack> {
        self.stacks
            .get(id)
            .ok_or_else(|| Error::StackNotFound(id.to_string()))
    }

    pub fn stack_mut(&mut self, id: &str) -> Result<&mut Stack> {
        self.stacks
            .get_mut(id)
            .ok_or_else(|| Error::StackNotFound(id.to_string()))
    }

    /// Stacks in declaration order.
    pub fn stacks(&self) -> impl Iterator<Item = &Stack> {
        self.stacks.values()
    }

    pub fn stack_ids(&self) -> Vec<&str> {
        self.stacks.keys().map(String::as_str).collect()
    }

    /// Stacks matching `selection`, or all of them when it is `None`.
    pub fn select(&self, selection: Option<&str>) -> Result<Vec<&Stack>> {
        match selection {
            Some(id) => Ok(vec![self.stack(id)?]),
            None => Ok(self.stacks().collect()),
        }
    }

    /// Validate every stack, stopping at the first failure.
    pub fn validate(&self) -> Result<()> {
        for stack in self.stacks.values() {
            stack.validate()?;
        }
        Ok(())
    }
}

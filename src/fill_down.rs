//! Fill-down of store identity across blanked rows
//!
//! Source sheets state a store code, name and carton once and leave the
//! following rows blank while they still belong to that store. [`FillDown`]
//! carries that context explicitly: a blank-code row either inherits from
//! [`FillDown::HasContext`] or, with [`FillDown::NoContext`], is an orphan.

/// The identity a row resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreContext {
    pub store_code: String,
    pub store_name: String,
    pub carton: Option<String>,
}

/// How a row got its identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The row named its own store
    Explicit(StoreContext),
    /// The row was blank and inherited the previous store
    Inherited(StoreContext),
    /// Blank row with nothing to inherit from
    Orphan,
}

impl Resolved {
    pub fn context(&self) -> Option<&StoreContext> {
        match self {
            Resolved::Explicit(ctx) | Resolved::Inherited(ctx) => Some(ctx),
            Resolved::Orphan => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FillDown {
    #[default]
    NoContext,
    HasContext(StoreContext),
}

impl FillDown {
    pub fn new() -> Self {
        Self::NoContext
    }

    /// Resolve one row's (code, name, carton) cells against the carried context.
    pub fn resolve(
        &mut self,
        code: Option<String>,
        name: Option<String>,
        carton: Option<String>,
    ) -> Resolved {
        let previous = match self {
            FillDown::HasContext(prev) => Some(prev.clone()),
            FillDown::NoContext => None,
        };
        let resolved = match (code, previous) {
            (Some(code), previous) => {
                let previous = previous.filter(|p| p.store_code == code);
                Resolved::Explicit(StoreContext {
                    store_name: name
                        .or_else(|| previous.as_ref().map(|p| p.store_name.clone()))
                        .unwrap_or_default(),
                    carton: carton.or_else(|| previous.and_then(|p| p.carton)),
                    store_code: code,
                })
            }
            (None, None) => Resolved::Orphan,
            (None, Some(prev)) => Resolved::Inherited(StoreContext {
                carton: carton.or(prev.carton),
                ..prev
            }),
        };
        if let Some(ctx) = resolved.context() {
            *self = FillDown::HasContext(ctx.clone());
        }
        resolved
    }

    /// Forget the carried store (total rows end a block)
    pub fn reset(&mut self) {
        *self = FillDown::NoContext;
    }

    pub fn has_context(&self) -> bool {
        matches!(self, FillDown::HasContext(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn test_leading_blank_row_is_orphan() {
        let mut fill = FillDown::new();
        assert_eq!(fill.resolve(None, s("name"), None), Resolved::Orphan);
        assert!(!fill.has_context());
    }

    #[test]
    fn test_blank_row_inherits_code_name_and_carton() {
        let mut fill = FillDown::new();
        fill.resolve(s("S01"), s("Shibuya"), s("1"));
        let resolved = fill.resolve(None, None, None);
        assert_eq!(
            resolved,
            Resolved::Inherited(StoreContext {
                store_code: "S01".to_string(),
                store_name: "Shibuya".to_string(),
                carton: s("1"),
            })
        );
    }

    #[test]
    fn test_new_carton_keeps_store() {
        let mut fill = FillDown::new();
        fill.resolve(s("S01"), s("Shibuya"), s("1"));
        let ctx = fill.resolve(None, None, s("2")).context().cloned().unwrap();
        assert_eq!(ctx.store_code, "S01");
        assert_eq!(ctx.carton, s("2"));
        // And the next blank row carries carton 2
        let ctx = fill.resolve(None, None, None).context().cloned().unwrap();
        assert_eq!(ctx.carton, s("2"));
    }

    #[test]
    fn test_new_code_does_not_inherit_other_store() {
        let mut fill = FillDown::new();
        fill.resolve(s("S01"), s("Shibuya"), s("1"));
        let ctx = fill.resolve(s("S02"), None, None).context().cloned().unwrap();
        assert_eq!(ctx.store_name, "");
        assert_eq!(ctx.carton, None);
    }

    #[test]
    fn test_reset_drops_context() {
        let mut fill = FillDown::new();
        fill.resolve(s("S01"), s("Shibuya"), None);
        fill.reset();
        assert_eq!(fill.resolve(None, None, None), Resolved::Orphan);
    }
}

use crate::types::SeqNum;

/// Binds one replicated field to the game state that owns it. `export`
/// reads the authoritative local value, `import` applies a remote one.
pub trait PropHandler<T> {
    /// Whether the game state currently holds a value to export
    fn has(&self) -> bool {
        true
    }

    fn export(&self) -> T;

    fn import(&mut self, value: &T, seq_num: SeqNum);

    /// Applies a value during rollback. Defaults to a plain import.
    fn rollback(&mut self, value: &T, seq_num: SeqNum) {
        self.import(value, seq_num);
    }

    /// Called on authoritative nodes when a peer sends a value they own
    fn validate(&mut self, _value: &T, _seq_num: SeqNum) {}
}

type HasFn = Box<dyn Fn() -> bool>;
type ExportFn<T> = Box<dyn Fn() -> T>;
type ApplyFn<T> = Box<dyn FnMut(&T, SeqNum)>;

/// Closure-backed `PropHandler`, for game objects that keep their state
/// behind shared handles
pub struct Prop<T> {
    has: Option<HasFn>,
    export: ExportFn<T>,
    import: ApplyFn<T>,
    rollback: Option<ApplyFn<T>>,
    validate: Option<ApplyFn<T>>,
}

impl<T> Prop<T> {
    pub fn new(
        export: impl Fn() -> T + 'static,
        import: impl FnMut(&T, SeqNum) + 'static,
    ) -> Self {
        Self {
            has: None,
            export: Box::new(export),
            import: Box::new(import),
            rollback: None,
            validate: None,
        }
    }

    pub fn with_has(mut self, has: impl Fn() -> bool + 'static) -> Self {
        self.has = Some(Box::new(has));
        self
    }

    pub fn with_rollback(mut self, rollback: impl FnMut(&T, SeqNum) + 'static) -> Self {
        self.rollback = Some(Box::new(rollback));
        self
    }

    pub fn with_validate(mut self, validate: impl FnMut(&T, SeqNum) + 'static) -> Self {
        self.validate = Some(Box::new(validate));
        self
    }
}

impl<T> PropHandler<T> for Prop<T> {
    fn has(&self) -> bool {
        self.has.as_ref().map_or(true, |has| has())
    }

    fn export(&self) -> T {
        (self.export)()
    }

    fn import(&mut self, value: &T, seq_num: SeqNum) {
        (self.import)(value, seq_num);
    }

    fn rollback(&mut self, value: &T, seq_num: SeqNum) {
        match self.rollback.as_mut() {
            Some(rollback) => rollback(value, seq_num),
            None => (self.import)(value, seq_num),
        }
    }

    fn validate(&mut self, value: &T, seq_num: SeqNum) {
        if let Some(validate) = self.validate.as_mut() {
            validate(value, seq_num);
        }
    }
}

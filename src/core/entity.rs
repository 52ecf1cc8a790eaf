/// Name every entity serializes its id under
pub const ID_FIELD: &str = "id";

/// A persistable record identified by an optional numeric id.
///
/// The id is `None` until the entity is first persisted; backends assign it.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Type name used in messages and backend table lookup
    const KIND: &'static str;

    /// Queryable fields besides [`ID_FIELD`]
    const FIELDS: &'static [&'static str];

    fn id(&self) -> Option<i64>;

    fn assign_id(&mut self, id: i64);

    /// Copy the mutable fields of `source` onto `self`.
    ///
    /// Which fields count as mutable is up to the entity. The repository
    /// restores the persisted id after calling this.
    fn update(&mut self, source: &Self);

    fn is_identified(&self) -> bool {
        self.id().is_some()
    }

    fn has_field(name: &str) -> bool {
        name == ID_FIELD || Self::FIELDS.contains(&name)
    }
}

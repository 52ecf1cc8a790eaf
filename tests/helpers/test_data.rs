// Test data factory: a `Person` entity mapped for both backends.

#![allow(dead_code)]

use restnucleus::{Entity, GenericRepository, MemoryBackend, QueryValue, RepositoryFactory, SqlEntity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Person {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub age: i64,
    pub active: bool,
    pub nickname: Option<String>,
}

impl Person {
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            age,
            active: true,
            nickname: None,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn nicknamed(mut self, nickname: &str) -> Self {
        self.nickname = Some(nickname.to_string());
        self
    }
}

impl Entity for Person {
    const KIND: &'static str = "Person";
    const FIELDS: &'static [&'static str] = &["name", "email", "age", "active", "nickname"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn update(&mut self, source: &Self) {
        self.name = source.name.clone();
        self.email = source.email.clone();
        self.age = source.age;
        self.active = source.active;
        self.nickname = source.nickname.clone();
    }
}

impl SqlEntity for Person {
    const TABLE: &'static str = "people";

    fn column_values(&self) -> Vec<QueryValue> {
        vec![
            self.name.clone().into(),
            self.email.clone().into(),
            self.age.into(),
            self.active.into(),
            self.nickname.clone().into(),
        ]
    }
}

/// A second entity kind, to check that kinds do not share rows or ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Option<i64>,
    pub label: String,
}

impl Tag {
    pub fn new(label: &str) -> Self {
        Self {
            id: None,
            label: label.to_string(),
        }
    }
}

impl Entity for Tag {
    const KIND: &'static str = "Tag";
    const FIELDS: &'static [&'static str] = &["label"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn update(&mut self, source: &Self) {
        self.label = source.label.clone();
    }
}

/// An entity whose `update` replaces the whole record, id included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Option<i64>,
    pub title: String,
    pub version: i64,
}

impl Snapshot {
    pub fn new(title: &str, version: i64) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            version,
        }
    }
}

impl Entity for Snapshot {
    const KIND: &'static str = "Snapshot";
    const FIELDS: &'static [&'static str] = &["title", "version"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn update(&mut self, source: &Self) {
        *self = Snapshot::new(&source.title, source.version);
    }
}

/// Fresh backend plus a repository with its logger installed
pub fn memory_repository() -> (MemoryBackend, GenericRepository<MemoryBackend>) {
    let backend = MemoryBackend::new();
    let repository = RepositoryFactory::new(backend.clone())
        .repository()
        .expect("fresh repository accepts a logger");
    (backend, repository)
}

/// Persist the classic roster used across query tests:
/// Ada 36, Alan 41, Grace 85 (inactive), Linus 28, Barbara 41.
/// Only Ada and Grace have nicknames.
pub async fn seed_people(repository: &mut GenericRepository<MemoryBackend>) -> Vec<Person> {
    let mut people = vec![
        Person::new("Ada", 36).nicknamed("Enchantress"),
        Person::new("Alan", 41),
        Person::new("Grace", 85).inactive().nicknamed("Amazing Grace"),
        Person::new("Linus", 28),
        Person::new("Barbara", 41),
    ];

    for person in people.iter_mut() {
        repository.add(person).await.expect("seed insert");
    }

    people
}

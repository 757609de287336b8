use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// A single term/definition pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub term: String,
    pub dfn: String,
}

impl Card {
    pub fn new(term: impl Into<String>, dfn: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            dfn: dfn.into(),
        }
    }

    /// Whether both sides carry non-whitespace text.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.term.trim().is_empty() && !self.dfn.trim().is_empty()
    }
}

/// # Ordered list of complete cards
///
/// Every constructor drops incomplete pairs, so a [`CardList`] never holds a card with an empty
/// term or definition. Insertion order is preserved.
///
/// In SQLite the list is stored as JSON text in a single column; the database never looks
/// inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CardList(Vec<Card>);

impl CardList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<Card> {
        self.0
    }
}

impl FromIterator<Card> for CardList {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        Self(iter.into_iter().filter(Card::is_complete).collect())
    }
}

impl From<Vec<Card>> for CardList {
    fn from(cards: Vec<Card>) -> Self {
        cards.into_iter().collect()
    }
}

impl Deref for CardList {
    type Target = [Card];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> IntoIterator for &'a CardList {
    type Item = &'a Card;
    type IntoIter = std::slice::Iter<'a, Card>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for CardList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Vec::<Card>::deserialize(deserializer).map(Self::from)
    }
}

/// Stored as JSON text, delegating to [`sqlx::types::Json`].
#[cfg(feature = "sqlx")]
impl<DB: sqlx::Database> sqlx::Type<DB> for CardList
where
    sqlx::types::Json<Vec<Card>>: sqlx::Type<DB>,
{
    fn type_info() -> DB::TypeInfo {
        <sqlx::types::Json<Vec<Card>> as sqlx::Type<DB>>::type_info()
    }

    fn compatible(ty: &DB::TypeInfo) -> bool {
        <sqlx::types::Json<Vec<Card>> as sqlx::Type<DB>>::compatible(ty)
    }
}

#[cfg(feature = "sqlx")]
impl<'r, DB> sqlx::Decode<'r, DB> for CardList
where
    sqlx::types::Json<Vec<Card>>: sqlx::Decode<'r, DB>,
    DB: sqlx::Database,
{
    fn decode(value: <DB as sqlx::Database>::ValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let json = <sqlx::types::Json<Vec<Card>> as sqlx::Decode<'r, DB>>::decode(value)?;
        Ok(Self::from(json.0))
    }
}

#[cfg(feature = "sqlx")]
impl<'q, DB> sqlx::Encode<'q, DB> for CardList
where
    DB: sqlx::Database,
    for<'a> sqlx::types::Json<&'a [Card]>: sqlx::Encode<'q, DB>,
{
    fn encode_by_ref(
        &self,
        buf: &mut <DB as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        let json = sqlx::types::Json(self.0.as_slice());
        <sqlx::types::Json<&[Card]> as sqlx::Encode<'q, DB>>::encode_by_ref(&json, buf)
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use study_core::model::{
    AttemptStats, Card, CardId, Category, CategoryId, Deck, DeckId, QuestionCodecError, Quiz,
    QuizId, UserId, ValidatedCard, ValidatedDeck, ValidatedQuiz, bucket_title, decode_questions,
    encode_questions,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store call did not complete within {0:?}")]
    Timeout(Duration),
}

impl From<QuestionCodecError> for StorageError {
    fn from(err: QuestionCodecError) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// A quiz row as the store returns it: questions still in their stored text
/// form, category title left-joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRecord {
    pub id: QuizId,
    pub owner_id: UserId,
    pub title: String,
    pub category_id: Option<CategoryId>,
    pub category_title: Option<String>,
    pub questions: String,
    pub created_at: DateTime<Utc>,
}

impl QuizRecord {
    /// Dashboard bucket for this row.
    #[must_use]
    pub fn bucket(&self) -> &str {
        bucket_title(self.category_title.as_deref())
    }

    /// Decode the stored questions and produce the domain `Quiz`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionCodecError` if the stored question text is malformed.
    pub fn into_quiz(self) -> Result<Quiz, QuestionCodecError> {
        let questions = decode_questions(&self.questions)?;
        Ok(Quiz {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            category_id: self.category_id,
            questions,
            created_at: self.created_at,
        })
    }
}

/// Insert payload for a new quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuizRecord {
    pub owner_id: UserId,
    pub title: String,
    pub category_id: CategoryId,
    pub questions: String,
    pub created_at: DateTime<Utc>,
}

impl NewQuizRecord {
    /// # Errors
    ///
    /// Returns `QuestionCodecError` if the questions cannot be serialized.
    pub fn from_validated(quiz: &ValidatedQuiz, owner_id: UserId) -> Result<Self, QuestionCodecError> {
        Ok(Self {
            owner_id,
            title: quiz.title.clone(),
            category_id: quiz.category_id,
            questions: encode_questions(&quiz.questions)?,
            created_at: quiz.created_at,
        })
    }
}

/// Mutable columns of a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizUpdate {
    pub title: String,
    pub category_id: CategoryId,
    pub questions: String,
}

impl QuizUpdate {
    /// # Errors
    ///
    /// Returns `QuestionCodecError` if the questions cannot be serialized.
    pub fn from_validated(quiz: &ValidatedQuiz) -> Result<Self, QuestionCodecError> {
        Ok(Self {
            title: quiz.title.clone(),
            category_id: quiz.category_id,
            questions: encode_questions(&quiz.questions)?,
        })
    }
}

/// Insert payload for a new deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeckRecord {
    pub owner_id: UserId,
    pub category: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl From<ValidatedDeck> for NewDeckRecord {
    fn from(deck: ValidatedDeck) -> Self {
        Self {
            owner_id: deck.owner_id,
            category: deck.category,
            title: deck.title,
            created_at: deck.created_at,
        }
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Quizzes owned by `owner`, oldest first, with category titles joined.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be read.
    async fn list_quizzes(&self, owner: UserId) -> Result<Vec<QuizRecord>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be read.
    async fn get_quiz(&self, id: QuizId) -> Result<Option<QuizRecord>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the category does not exist.
    async fn insert_quiz(&self, quiz: NewQuizRecord) -> Result<QuizId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if `owner` has no quiz `id`.
    async fn update_quiz(
        &self,
        id: QuizId,
        owner: UserId,
        update: QuizUpdate,
    ) -> Result<(), StorageError>;

    /// Deletes the quiz and every stats row that references it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if `owner` has no quiz `id`.
    async fn delete_quiz(&self, id: QuizId, owner: UserId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be read.
    async fn get_stats(
        &self,
        quiz_id: QuizId,
        user_id: UserId,
    ) -> Result<Option<AttemptStats>, StorageError>;

    /// Stats rows for `user_id` limited to `quiz_ids`. Empty ids yield no rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be read.
    async fn list_stats(
        &self,
        user_id: UserId,
        quiz_ids: &[QuizId],
    ) -> Result<Vec<AttemptStats>, StorageError>;

    /// Insert or overwrite the single row for `(quiz_id, user_id)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written.
    async fn upsert_stats(&self, stats: &AttemptStats) -> Result<(), StorageError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be read.
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written.
    async fn insert_category(&self, title: &str) -> Result<CategoryId, StorageError>;

    /// Quizzes pointing at the category keep their rows and lose the join.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the category does not exist.
    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait DeckRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written.
    async fn insert_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be read.
    async fn get_deck(&self, id: DeckId, owner: UserId) -> Result<Option<Deck>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be read.
    async fn list_decks(&self, owner: UserId) -> Result<Vec<Deck>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if `owner` has no deck `id`.
    async fn rename_deck(&self, id: DeckId, owner: UserId, title: &str)
    -> Result<(), StorageError>;

    /// Deletes the deck together with its cards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if `owner` has no deck `id`.
    async fn delete_deck(&self, id: DeckId, owner: UserId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait CardRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the deck does not exist.
    async fn insert_card(&self, card: &ValidatedCard) -> Result<CardId, StorageError>;

    /// Cards of a deck, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be read.
    async fn list_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card is not in the deck.
    async fn delete_card(&self, deck_id: DeckId, card_id: CardId) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ADAPTER ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct State {
    next_id: u64,
    categories: BTreeMap<CategoryId, Category>,
    quizzes: BTreeMap<QuizId, NewQuizRecord>,
    stats: HashMap<(QuizId, UserId), AttemptStats>,
    decks: BTreeMap<DeckId, Deck>,
    cards: BTreeMap<(DeckId, CardId), Card>,
}

impl State {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn quiz_record(&self, id: QuizId, row: &NewQuizRecord) -> QuizRecord {
        QuizRecord {
            id,
            owner_id: row.owner_id,
            title: row.title.clone(),
            category_id: self
                .categories
                .contains_key(&row.category_id)
                .then_some(row.category_id),
            category_title: self
                .categories
                .get(&row.category_id)
                .map(|c| c.title.clone()),
            questions: row.questions.clone(),
            created_at: row.created_at,
        }
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Store a quiz row with arbitrary question text, bypassing encoding.
    ///
    /// Lets tests reproduce rows written by older clients.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn insert_raw_quiz(&self, quiz: NewQuizRecord) -> Result<QuizId, StorageError> {
        let mut state = self.lock()?;
        let id = QuizId::new(state.allocate());
        state.quizzes.insert(id, quiz);
        Ok(id)
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn list_quizzes(&self, owner: UserId) -> Result<Vec<QuizRecord>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .quizzes
            .iter()
            .filter(|(_, row)| row.owner_id == owner)
            .map(|(id, row)| state.quiz_record(*id, row))
            .collect())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<QuizRecord>, StorageError> {
        let state = self.lock()?;
        Ok(state.quizzes.get(&id).map(|row| state.quiz_record(id, row)))
    }

    async fn insert_quiz(&self, quiz: NewQuizRecord) -> Result<QuizId, StorageError> {
        let mut state = self.lock()?;
        if !state.categories.contains_key(&quiz.category_id) {
            return Err(StorageError::Conflict(format!(
                "category {} does not exist",
                quiz.category_id
            )));
        }
        let id = QuizId::new(state.allocate());
        state.quizzes.insert(id, quiz);
        Ok(id)
    }

    async fn update_quiz(
        &self,
        id: QuizId,
        owner: UserId,
        update: QuizUpdate,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if !state.categories.contains_key(&update.category_id) {
            return Err(StorageError::Conflict(format!(
                "category {} does not exist",
                update.category_id
            )));
        }
        let row = state
            .quizzes
            .get_mut(&id)
            .filter(|row| row.owner_id == owner)
            .ok_or(StorageError::NotFound)?;
        row.title = update.title;
        row.category_id = update.category_id;
        row.questions = update.questions;
        Ok(())
    }

    async fn delete_quiz(&self, id: QuizId, owner: UserId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        match state.quizzes.get(&id) {
            Some(row) if row.owner_id == owner => {}
            _ => return Err(StorageError::NotFound),
        }
        state.quizzes.remove(&id);
        state.stats.retain(|(quiz_id, _), _| *quiz_id != id);
        Ok(())
    }
}

#[async_trait]
impl StatsRepository for InMemoryRepository {
    async fn get_stats(
        &self,
        quiz_id: QuizId,
        user_id: UserId,
    ) -> Result<Option<AttemptStats>, StorageError> {
        let state = self.lock()?;
        Ok(state.stats.get(&(quiz_id, user_id)).cloned())
    }

    async fn list_stats(
        &self,
        user_id: UserId,
        quiz_ids: &[QuizId],
    ) -> Result<Vec<AttemptStats>, StorageError> {
        let state = self.lock()?;
        Ok(quiz_ids
            .iter()
            .filter_map(|quiz_id| state.stats.get(&(*quiz_id, user_id)).cloned())
            .collect())
    }

    async fn upsert_stats(&self, stats: &AttemptStats) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if !state.quizzes.contains_key(&stats.quiz_id) {
            return Err(StorageError::Conflict(format!(
                "quiz {} does not exist",
                stats.quiz_id
            )));
        }
        state
            .stats
            .insert((stats.quiz_id, stats.user_id), stats.clone());
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let state = self.lock()?;
        Ok(state.categories.values().cloned().collect())
    }

    async fn insert_category(&self, title: &str) -> Result<CategoryId, StorageError> {
        let mut state = self.lock()?;
        let id = CategoryId::new(state.allocate());
        let category =
            Category::new(id, title).map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.categories.insert(id, category);
        Ok(id)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state
            .categories
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl DeckRepository for InMemoryRepository {
    async fn insert_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError> {
        let mut state = self.lock()?;
        let id = DeckId::new(state.allocate());
        let deck = Deck::new(id, deck.owner_id, deck.category, deck.title, deck.created_at)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.decks.insert(id, deck);
        Ok(id)
    }

    async fn get_deck(&self, id: DeckId, owner: UserId) -> Result<Option<Deck>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .decks
            .get(&id)
            .filter(|d| d.owner_id() == owner)
            .cloned())
    }

    async fn list_decks(&self, owner: UserId) -> Result<Vec<Deck>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .decks
            .values()
            .filter(|d| d.owner_id() == owner)
            .cloned()
            .collect())
    }

    async fn rename_deck(
        &self,
        id: DeckId,
        owner: UserId,
        title: &str,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let current = state
            .decks
            .get(&id)
            .filter(|d| d.owner_id() == owner)
            .ok_or(StorageError::NotFound)?;
        let renamed = Deck::new(
            id,
            owner,
            current.category(),
            title,
            current.created_at(),
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.decks.insert(id, renamed);
        Ok(())
    }

    async fn delete_deck(&self, id: DeckId, owner: UserId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if state
            .decks
            .get(&id)
            .filter(|d| d.owner_id() == owner)
            .is_none()
        {
            return Err(StorageError::NotFound);
        }
        state.decks.remove(&id);
        state.cards.retain(|(deck_id, _), _| *deck_id != id);
        Ok(())
    }
}

#[async_trait]
impl CardRepository for InMemoryRepository {
    async fn insert_card(&self, card: &ValidatedCard) -> Result<CardId, StorageError> {
        let mut state = self.lock()?;
        if !state.decks.contains_key(&card.deck_id) {
            return Err(StorageError::Conflict(format!(
                "deck {} does not exist",
                card.deck_id
            )));
        }
        let id = CardId::new(state.allocate());
        state
            .cards
            .insert((card.deck_id, id), card.clone().assign_id(id));
        Ok(id)
    }

    async fn list_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .cards
            .range((deck_id, CardId::new(0))..=(deck_id, CardId::new(u64::MAX)))
            .map(|(_, card)| card.clone())
            .collect())
    }

    async fn delete_card(&self, deck_id: DeckId, card_id: CardId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state
            .cards
            .remove(&(deck_id, card_id))
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

//
// ─── BUNDLE ────────────────────────────────────────────────────────────────────
//

/// Every repository behind trait objects so backends can be swapped.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub stats: Arc<dyn StatsRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub decks: Arc<dyn DeckRepository>,
    pub cards: Arc<dyn CardRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Use one adapter value for every repository.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: QuizRepository
            + StatsRepository
            + CategoryRepository
            + DeckRepository
            + CardRepository
            + Clone
            + 'static,
    {
        Self {
            quizzes: Arc::new(repo.clone()),
            stats: Arc::new(repo.clone()),
            categories: Arc::new(repo.clone()),
            decks: Arc::new(repo.clone()),
            cards: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::{CardDraft, DeckDraft, Question};
    use study_core::time::fixed_now;

    fn new_quiz(owner: UserId, category_id: CategoryId) -> NewQuizRecord {
        NewQuizRecord {
            owner_id: owner,
            title: "Capitales".into(),
            category_id,
            questions: encode_questions(&[Question::new(
                "Capitale de la France ?",
                vec!["Lyon".into(), "Paris".into()],
                [1],
            )])
            .unwrap(),
            created_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn quiz_list_joins_category_and_filters_owner() {
        let repo = InMemoryRepository::new();
        let geo = repo.insert_category("Géographie").await.unwrap();
        let owner = UserId::random();
        let other = UserId::random();

        let id = repo.insert_quiz(new_quiz(owner, geo)).await.unwrap();
        repo.insert_quiz(new_quiz(other, geo)).await.unwrap();

        let rows = repo.list_quizzes(owner).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].category_title.as_deref(), Some("Géographie"));
        assert_eq!(rows[0].clone().into_quiz().unwrap().question_count(), 1);
    }

    #[tokio::test]
    async fn deleted_category_leaves_quiz_uncategorized() {
        let repo = InMemoryRepository::new();
        let cat = repo.insert_category("Temp").await.unwrap();
        let owner = UserId::random();
        repo.insert_quiz(new_quiz(owner, cat)).await.unwrap();

        repo.delete_category(cat).await.unwrap();

        let rows = repo.list_quizzes(owner).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category_title, None);
        assert_eq!(rows[0].category_id, None);
        assert_eq!(rows[0].bucket(), study_core::model::UNCATEGORIZED);
    }

    #[tokio::test]
    async fn insert_rejects_unknown_category() {
        let repo = InMemoryRepository::new();
        let err = repo
            .insert_quiz(new_quiz(UserId::random(), CategoryId::new(404)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn stats_upsert_keeps_one_row_per_pair() {
        let repo = InMemoryRepository::new();
        let cat = repo.insert_category("Maths").await.unwrap();
        let user = UserId::random();
        let quiz = repo.insert_quiz(new_quiz(user, cat)).await.unwrap();

        let first = AttemptStats::first_attempt(quiz, user, 50, fixed_now()).unwrap();
        repo.upsert_stats(&first).await.unwrap();
        let second = AttemptStats::record(Some(&first), quiz, user, 75, fixed_now()).unwrap();
        repo.upsert_stats(&second).await.unwrap();

        let rows = repo.list_stats(user, &[quiz]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].attempt_count(), 2);
        assert_eq!(rows[0].latest_score_percent(), 75);
        assert!(repo.list_stats(user, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_are_owner_scoped() {
        let repo = InMemoryRepository::new();
        let cat = repo.insert_category("Maths").await.unwrap();
        let owner = UserId::random();
        let quiz = repo.insert_quiz(new_quiz(owner, cat)).await.unwrap();

        let update = QuizUpdate {
            title: "Renamed".into(),
            category_id: cat,
            questions: "[]".into(),
        };
        let err = repo
            .update_quiz(quiz, UserId::random(), update.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        repo.update_quiz(quiz, owner, update).await.unwrap();
        assert_eq!(repo.get_quiz(quiz).await.unwrap().unwrap().title, "Renamed");

        assert!(matches!(
            repo.delete_quiz(quiz, UserId::random()).await,
            Err(StorageError::NotFound)
        ));
        repo.delete_quiz(quiz, owner).await.unwrap();
        assert!(repo.get_quiz(quiz).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_deck_removes_its_cards() {
        let repo = InMemoryRepository::new();
        let owner = UserId::random();
        let deck = DeckDraft {
            owner_id: owner,
            category: "Langues".into(),
            title: "Espagnol".into(),
        }
        .validate(fixed_now())
        .unwrap();
        let deck_id = repo
            .insert_deck(NewDeckRecord::from(deck))
            .await
            .unwrap();

        let card = CardDraft {
            deck_id,
            front: "hola".into(),
            back: "bonjour".into(),
        }
        .validate(fixed_now())
        .unwrap();
        repo.insert_card(&card).await.unwrap();
        assert_eq!(repo.list_cards(deck_id).await.unwrap().len(), 1);

        repo.delete_deck(deck_id, owner).await.unwrap();
        assert!(repo.list_cards(deck_id).await.unwrap().is_empty());
        assert!(repo.get_deck(deck_id, owner).await.unwrap().is_none());
    }
}

use chrono::{Duration, NaiveDate};
use rand::{distributions::Alphanumeric, Rng};

pub type CardId = String;
pub type ListId = String;

const ID_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub id: String,
    pub title: String,
    pub lists: Vec<CardList>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardList {
    pub id: ListId,
    pub title: String,
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub title: String,
    pub description: String,
    pub start: NaiveDate,
    pub due: NaiveDate,
    pub end: NaiveDate,
    pub duration: Duration,
}

/// Random alphanumeric identifier, 62^20 possible values.
pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

impl Board {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Board {
            id: id.into(),
            title: title.into(),
            lists: Vec::new(),
        }
    }

    pub fn add_list(&mut self, list: CardList) {
        self.lists.push(list);
    }

    pub fn find_list(&self, id: &str) -> Option<&CardList> {
        self.lists.iter().find(|l| l.id == id)
    }

    pub fn find_list_index(&self, id: &str) -> Option<usize> {
        self.lists.iter().position(|l| l.id == id)
    }

    pub fn remove_list(&mut self, id: &str) -> Option<CardList> {
        let idx = self.find_list_index(id)?;
        Some(self.lists.remove(idx))
    }

    pub fn update_list(&mut self, list: CardList) -> bool {
        match self.lists.iter_mut().find(|l| l.id == list.id) {
            Some(slot) => {
                *slot = list;
                true
            }
            None => false,
        }
    }

    /// Appends to the list with `list_id`. Returns the card back if the list is absent.
    pub fn add_card(&mut self, list_id: &str, card: Card) -> Result<(), Card> {
        match self.lists.iter_mut().find(|l| l.id == list_id) {
            Some(list) => {
                list.add_card(card);
                Ok(())
            }
            None => Err(card),
        }
    }

    pub fn find_card(&self, list_id: &str, id: &str) -> Option<&Card> {
        self.find_list(list_id)?.find_card(id)
    }

    pub fn remove_card(&mut self, list_id: &str, id: &str) -> Option<Card> {
        self.lists
            .iter_mut()
            .find(|l| l.id == list_id)?
            .remove_card(id)
    }

    /// Replaces the card with the same id in whichever list holds it.
    pub fn update_card(&mut self, card: Card) -> bool {
        match self
            .lists
            .iter_mut()
            .find(|l| l.find_card(&card.id).is_some())
        {
            Some(list) => list.update_card(card),
            None => false,
        }
    }

    pub fn card_count(&self) -> usize {
        self.lists.iter().map(|l| l.cards.len()).sum()
    }
}

impl CardList {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        CardList {
            id: id.into(),
            title: title.into(),
            cards: Vec::new(),
        }
    }

    pub fn add_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn find_card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn remove_card(&mut self, id: &str) -> Option<Card> {
        let idx = self.cards.iter().position(|c| c.id == id)?;
        Some(self.cards.remove(idx))
    }

    pub fn update_card(&mut self, card: Card) -> bool {
        match self.cards.iter_mut().find(|c| c.id == card.id) {
            Some(slot) => {
                *slot = card;
                true
            }
            None => false,
        }
    }
}

impl Card {
    /// A card dated `today` with zero duration; the id is left empty until it is placed.
    pub fn new(title: impl Into<String>, today: NaiveDate) -> Self {
        Card {
            id: String::new(),
            title: title.into(),
            description: String::new(),
            start: today,
            due: today,
            end: today,
            duration: Duration::zero(),
        }
    }
}

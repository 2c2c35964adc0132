use crate::content::{Chapter, Volume};
use crate::formula;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

/// 闪卡来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSource {
    Concept,
    Formula,
}

/// 闪卡
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flashcard {
    /// 稳定标识，用于记录复习情况：`vol1:3:concept:0`
    pub key: String,
    pub front: String,
    pub back: String,
    pub source: CardSource,
    pub chapter_title: String,
}

/// 由章节生成闪卡
///
/// 每个概念一张（术语 ↔ 定义，附例子），每个关键公式一张（名称 ↔ 公式与说明）
pub fn cards_for_chapter(volume: Volume, chapter: &Chapter) -> Vec<Flashcard> {
    let mut cards = Vec::with_capacity(chapter.concepts.len() + chapter.key_formulas.len());

    for (i, concept) in chapter.concepts.iter().enumerate() {
        let back = match &concept.example {
            Some(example) => format!("{}\n\nExample: {}", concept.definition, example),
            None => concept.definition.clone(),
        };
        cards.push(Flashcard {
            key: format!("{}:{}:concept:{}", volume, chapter.id, i),
            front: concept.term.clone(),
            back,
            source: CardSource::Concept,
            chapter_title: chapter.title.clone(),
        });
    }

    for (i, f) in chapter.key_formulas.iter().enumerate() {
        let rendered = formula::to_plain_text(&formula::render(&f.formula));
        cards.push(Flashcard {
            key: format!("{}:{}:formula:{}", volume, chapter.id, i),
            front: f.name.clone(),
            back: format!("{}\n\n{}", rendered, f.description),
            source: CardSource::Formula,
            chapter_title: chapter.title.clone(),
        });
    }

    cards
}

/// 闪卡组
///
/// 维护当前卡片位置和正反面状态，前后翻页循环
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Flashcard>,
    current: usize,
    flipped: bool,
}

impl Deck {
    pub fn new(cards: Vec<Flashcard>) -> Self {
        Self {
            cards,
            current: 0,
            flipped: false,
        }
    }

    /// 由一组章节生成闪卡组，保持章节顺序
    pub fn from_chapters<'a, I>(volume: Volume, chapters: I) -> Self
    where
        I: IntoIterator<Item = &'a Chapter>,
    {
        let cards = chapters
            .into_iter()
            .flat_map(|c| cards_for_chapter(volume, c))
            .collect();
        Self::new(cards)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn position(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&Flashcard> {
        self.cards.get(self.current)
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// 当前朝上的一面
    pub fn visible_side(&self) -> Option<&str> {
        self.current().map(|card| {
            if self.flipped {
                card.back.as_str()
            } else {
                card.front.as_str()
            }
        })
    }

    pub fn flip(&mut self) {
        if !self.cards.is_empty() {
            self.flipped = !self.flipped;
        }
    }

    pub fn next_card(&mut self) -> Option<&Flashcard> {
        if self.cards.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.cards.len();
        self.flipped = false;
        self.current()
    }

    pub fn previous_card(&mut self) -> Option<&Flashcard> {
        if self.cards.is_empty() {
            return None;
        }
        self.current = (self.current + self.cards.len() - 1) % self.cards.len();
        self.flipped = false;
        self.current()
    }

    /// 以给定种子洗牌，回到第一张
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.cards.shuffle(&mut rng);
        self.current = 0;
        self.flipped = false;
    }
}

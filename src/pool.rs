use include_dir::{include_dir, Dir};
use log::debug;
use serde::Deserialize;
use std::{fs, path::Path};

use crate::error::{Result, TadakError};
use crate::item::{Difficulty, Language, PracticeItem, PracticeType};

static POOL_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/pools");

#[derive(Deserialize, Clone, Debug)]
struct PoolEntry {
    content: String,
    #[serde(default)]
    difficulty: Option<Difficulty>,
}

#[derive(Deserialize, Clone, Debug)]
struct PoolFile {
    name: String,
    language: Language,
    kind: PracticeType,
    items: Vec<PoolEntry>,
}

/// Which bundled list backs a practice type
fn pool_kind(practice_type: PracticeType) -> PracticeType {
    match practice_type {
        PracticeType::Dictation | PracticeType::ReadAloud => PracticeType::Sentence,
        other => other,
    }
}

/// Load the bundled items for a practice type and language
pub fn load(practice_type: PracticeType, language: Language) -> Result<Vec<PracticeItem>> {
    let kind = pool_kind(practice_type);
    let file_name = format!("{}_{}.json", language, kind);
    let file = POOL_DIR
        .get_file(&file_name)
        .ok_or_else(|| TadakError::UnknownPool(file_name.clone()))?;
    let contents = file
        .contents_utf8()
        .ok_or_else(|| TadakError::UnknownPool(file_name.clone()))?;

    parse(contents, kind)
}

fn parse(contents: &str, kind: PracticeType) -> Result<Vec<PracticeItem>> {
    let pool: PoolFile = serde_json::from_str(contents)?;
    if pool.kind != kind {
        return Err(TadakError::PoolKindMismatch {
            pool: pool.name,
            expected: kind,
            found: pool.kind,
        });
    }
    debug!("loaded pool {} ({} items)", pool.name, pool.items.len());
    let language = pool.language;

    Ok(pool
        .items
        .into_iter()
        .map(|entry| PracticeItem {
            content: entry.content,
            language,
            difficulty: entry.difficulty,
        })
        .collect())
}

/// A single custom prompt
pub fn from_prompt(prompt: &str, language: Language) -> Vec<PracticeItem> {
    vec![PracticeItem::new(prompt, language)]
}

/// Every non-blank line of a plain text file becomes an item
pub fn from_text_file<P: AsRef<Path>>(path: P, language: Language) -> Result<Vec<PracticeItem>> {
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| PracticeItem::new(line, language))
        .collect())
}

/// Reject pools that cannot drive a session
pub fn validate(items: &[PracticeItem]) -> Result<()> {
    if items.is_empty() {
        return Err(TadakError::EmptyPool);
    }
    if items.iter().all(|item| item.content.is_empty()) {
        return Err(TadakError::NoPracticeText);
    }
    Ok(())
}

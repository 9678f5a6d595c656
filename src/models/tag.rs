use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::book::Entity")]
    Book,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        super::book_tags::Relation::Book.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::book_tags::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Tag created by the migrations, and the keywords that suggest it during import.
pub struct DefaultTag {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

/// Name of the children's-book tag.
pub const CHILDREN_TAG: &str = "За децу";

pub const DEFAULT_TAGS: &[DefaultTag] = &[
    DefaultTag {
        name: CHILDREN_TAG,
        keywords: &["за децу", "za decu"],
    },
    DefaultTag {
        name: "Поезија",
        keywords: &[],
    },
    DefaultTag {
        name: "Роман",
        keywords: &[],
    },
    DefaultTag {
        name: "Приповетке",
        keywords: &[],
    },
    DefaultTag {
        name: "Есеји",
        keywords: &[],
    },
];

/// Build a URL-safe slug: Serbian Cyrillic is transliterated to Latin,
/// diacritics are stripped and everything else collapses into single dashes.
pub fn slugify(name: &str) -> String {
    let mut latin = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        match transliterate(c) {
            Some(s) => latin.push_str(s),
            None => latin.push(c),
        }
    }

    let mut slug = String::with_capacity(latin.len());
    for c in latin.nfd() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if c.is_alphanumeric() {
            // Non-ASCII letters that survive decomposition are dropped.
            continue;
        } else if is_combining_mark(c) {
            continue;
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F)
}

fn transliterate(c: char) -> Option<&'static str> {
    let s = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'ђ' => "dj",
        'е' => "e",
        'ж' => "z",
        'з' => "z",
        'и' => "i",
        'ј' => "j",
        'к' => "k",
        'л' => "l",
        'љ' => "lj",
        'м' => "m",
        'н' => "n",
        'њ' => "nj",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'ћ' => "c",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "c",
        'ч' => "c",
        'џ' => "dz",
        'ш' => "s",
        'đ' => "dj",
        _ => return None,
    };
    Some(s)
}

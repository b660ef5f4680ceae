use std::fmt;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

/// The content document behind a resume page.
///
/// Every field tolerates absence. Renderers supply fallbacks where the
/// page needs one, everything else is simply skipped.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Site {
    pub name: Option<String>,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub seo: Option<Seo>,
    #[serde(deserialize_with = "null_as_default")]
    pub projects: Vec<Project>,
    pub skills: SkillCategories,
    #[serde(deserialize_with = "null_as_default")]
    pub socials: Vec<Social>,
}

impl Site {
    /// Document title: the SEO title when set, otherwise derived from the name.
    pub fn page_title(&self) -> String {
        match self.seo.as_ref().and_then(|seo| non_empty(&seo.title)) {
            Some(title) => title.to_string(),
            None => format!("{} – Resume", self.name.as_deref().unwrap_or_default()),
        }
    }

    pub fn seo_description(&self) -> Option<&str> {
        self.seo.as_ref().and_then(|seo| non_empty(&seo.description))
    }

    pub fn email(&self) -> Option<&str> {
        non_empty(&self.email)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Seo {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Project {
    pub title: Option<String>,
    pub blurb: Option<String>,
    pub href: Option<String>,
    pub icon: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

impl Project {
    pub const UNTITLED: &'static str = "Untitled Project";
    pub const DEFAULT_ICON: &'static str = "fa-cogs";

    pub fn title(&self) -> &str {
        non_empty(&self.title).unwrap_or(Self::UNTITLED)
    }

    pub fn blurb(&self) -> &str {
        non_empty(&self.blurb).unwrap_or_default()
    }

    pub fn href(&self) -> Option<&str> {
        non_empty(&self.href)
    }

    pub fn icon(&self) -> &str {
        non_empty(&self.icon).unwrap_or(Self::DEFAULT_ICON)
    }
}

/// A skill is either a bare label or a label with its own icon.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Skill {
    Label(String),
    Detailed {
        #[serde(default)]
        label: String,
        #[serde(default)]
        icon: Option<String>,
    },
}

impl Skill {
    pub const DEFAULT_ICON: &'static str = "fas fa-check-circle";

    pub fn label(&self) -> &str {
        match self {
            Skill::Label(label) => label,
            Skill::Detailed { label, .. } => label,
        }
    }

    pub fn icon(&self) -> &str {
        match self {
            Skill::Label(_) => Self::DEFAULT_ICON,
            Skill::Detailed { icon, .. } => non_empty(icon).unwrap_or(Self::DEFAULT_ICON),
        }
    }
}

/// Skill categories in the order the content document lists them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillCategories(Vec<(String, Vec<Skill>)>);

impl SkillCategories {
    pub fn new(categories: Vec<(String, Vec<Skill>)>) -> Self {
        Self(categories)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Skill])> {
        self.0
            .iter()
            .map(|(name, skills)| (name.as_str(), skills.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for SkillCategories {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CategoriesVisitor;

        impl<'de> Visitor<'de> for CategoriesVisitor {
            type Value = SkillCategories;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of skill category names to skill lists")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(SkillCategories::default())
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut categories: Vec<(String, Vec<Skill>)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, skills)) = map.next_entry::<String, Option<Vec<Skill>>>()? {
                    // A repeated key replaces the earlier entry in place
                    let skills = skills.unwrap_or_default();
                    match categories.iter().position(|(existing, _)| *existing == name) {
                        Some(pos) => categories[pos].1 = skills,
                        None => categories.push((name, skills)),
                    }
                }
                Ok(SkillCategories(categories))
            }
        }

        deserializer.deserialize_any(CategoriesVisitor)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Social {
    pub label: String,
    pub href: String,
    pub icon: Option<String>,
}

impl Social {
    pub const DEFAULT_ICON: &'static str = "fas fa-link";

    pub fn icon(&self) -> &str {
        non_empty(&self.icon).unwrap_or(Self::DEFAULT_ICON)
    }
}

/// An explicit `null` reads the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

use serde::{Deserialize, Deserializer};

/// Query-string filters for the roster listing. All present filters must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    pub q: Option<String>,
    pub day: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_participants: Option<u32>,
    pub tags: Option<String>, // comma separated, any-of
}

pub struct ActivityFacts<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub schedule: &'a str,
    pub capacity: u32,
    pub tags: &'a [String],
}

impl ActivityFilter {
    pub fn is_empty(&self) -> bool {
        non_blank(self.q.as_deref()).is_none()
            && non_blank(self.day.as_deref()).is_none()
            && self.max_participants.is_none()
            && self.wanted_tags().is_empty()
    }

    pub fn matches(&self, facts: &ActivityFacts<'_>) -> bool {
        if let Some(q) = non_blank(self.q.as_deref()) {
            let q = q.to_lowercase();
            if !facts.name.to_lowercase().contains(&q)
                && !facts.description.to_lowercase().contains(&q)
            {
                return false;
            }
        }

        if let Some(day) = non_blank(self.day.as_deref()) {
            if !facts.schedule.to_lowercase().contains(&day.to_lowercase()) {
                return false;
            }
        }

        if let Some(max) = self.max_participants {
            if facts.capacity > max {
                return false;
            }
        }

        let wanted = self.wanted_tags();
        if !wanted.is_empty() {
            let hit = facts
                .tags
                .iter()
                .any(|t| wanted.contains(&t.trim().to_lowercase()));
            if !hit {
                return false;
            }
        }

        true
    }

    fn wanted_tags(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .map(parse_tags)
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect()
    }
}

// `?max_participants=` means "no limit", not a parse failure.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match non_blank(raw.as_deref()) {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: Option<String>,
    pub year: String,
    pub semester: Option<String>,
    pub nz: String,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub hall: Vec<String>,
    pub hour: Vec<String>,
    pub day: Vec<String>,
    pub semester: Vec<String>,
    pub group: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub lecturer: Vec<String>,
}

/// One entry of the course list file. Only `id` is read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CourseEntry {
    #[serde(deserialize_with = "id_from_text_or_number")]
    pub id: String,
}

fn id_from_text_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(de)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One compact JSON document per line.
    #[default]
    Json,
    /// Pretty debug print of the in-memory record.
    Debug,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::form::{FilePart, FormPayload, MultipartForm};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCategory {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCategoryInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderForm {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub logo: Option<FilePart>,
}

impl FormPayload for ProviderForm {
    fn to_form(&self) -> MultipartForm {
        MultipartForm::new()
            .text("name", self.name.as_deref())
            .text("isActive", self.is_active)
            .file("logo", self.logo.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularGame {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopularGameForm {
    pub name: Option<String>,
    pub category: Option<String>,
    pub provider: Option<String>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
    pub image: Option<FilePart>,
}

impl FormPayload for PopularGameForm {
    fn to_form(&self) -> MultipartForm {
        MultipartForm::new()
            .text("name", self.name.as_deref())
            .text("category", self.category.as_deref())
            .text("provider", self.provider.as_deref())
            .text("order", self.order)
            .text("isActive", self.is_active)
            .file("image", self.image.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApkFile {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub version: String,
    /// Upload responses name the stored file after the form field.
    #[serde(default, alias = "file")]
    pub file_url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub release_notes: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApkFileForm {
    pub version: Option<String>,
    pub release_notes: Option<String>,
    pub is_active: Option<bool>,
    pub file: Option<FilePart>,
}

impl FormPayload for ApkFileForm {
    fn to_form(&self) -> MultipartForm {
        MultipartForm::new()
            .text("version", self.version.as_deref())
            .text("releaseNotes", self.release_notes.as_deref())
            .text("isActive", self.is_active)
            .file("file", self.file.clone())
    }
}

use serde::{Deserialize, Serialize};

pub type Id = i64;

/// A single blog entry as stored in the `blogs` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Id,
    pub name: String, // author display name, "" when not given
    pub title: String,
    pub content: String,
    pub image_path: Option<String>, // bare filename inside the image directory
    pub likes: i64,                 // placeholder counter, never mutated
    pub liked: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPost {
    pub name: String,
    pub title: String,
    pub content: String,
    pub image_path: Option<String>,
}

impl NewPost {
    /// Title and content must carry something other than whitespace.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".into());
        }
        if self.content.trim().is_empty() {
            return Err("content must not be empty".into());
        }
        Ok(())
    }
}

/// Text fields submitted through the create form, echoed back on redisplay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostForm {
    pub name: String,
    pub title: String,
    pub content: String,
}

impl PostForm {
    pub fn into_new_post(self, image_path: Option<String>) -> NewPost {
        NewPost { name: self.name, title: self.title, content: self.content, image_path }
    }
}

/// Per-field messages shown next to the offending inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl FormErrors {
    pub fn check(form: &PostForm) -> Self {
        let required = |v: &str| v.trim().is_empty().then(|| "This field is required.".to_string());
        Self { title: required(&form.title), content: required(&form.content), image: None }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.image.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
}

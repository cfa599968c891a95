//! Uploaded images and their ALT text
use sea_orm::{ActiveValue::Set, IntoActiveModel, QueryOrder, entity::prelude::*};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "attachments")]
/// An image in the media library
pub struct Model {
    #[sea_orm(primary_key)]
    /// db id
    pub id: i32,
    /// stored file name under the upload dir
    pub filename: String,
    /// display title
    pub title: String,
    /// detected mime type
    pub mime_type: String,
    /// ALT text, empty when unset
    pub alt_text: String,
    /// upload time
    pub created_at: DateTime,
}

/// no relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    /// All attachments, newest first.
    pub async fn newest_first<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>, DbErr> {
        Self::find().order_by_desc(Column::Id).all(db).await
    }
}

/// Stores a new attachment row.
pub async fn create<C: ConnectionTrait>(
    db: &C,
    filename: &str,
    title: &str,
    mime_type: &str,
) -> Result<Model, DbErr> {
    ActiveModel {
        filename: Set(filename.to_string()),
        title: Set(title.to_string()),
        mime_type: Set(mime_type.to_string()),
        alt_text: Set(String::new()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Overwrites the ALT text of an attachment, returns false when it doesn't exist.
pub async fn set_alt_text<C: ConnectionTrait>(
    db: &C,
    id: i32,
    alt_text: &str,
) -> Result<bool, DbErr> {
    let Some(model) = Entity::find_by_id(id).one(db).await? else {
        return Ok(false);
    };
    let mut am = model.into_active_model();
    am.alt_text = Set(alt_text.to_string());
    am.update(db).await?;
    Ok(true)
}

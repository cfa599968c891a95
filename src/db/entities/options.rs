//! Generic name/value configuration storage
use sea_orm::{ActiveValue::Set, IntoActiveModel, TransactionTrait, entity::prelude::*};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "options")]
/// A single named option
pub struct Model {
    #[sea_orm(primary_key)]
    /// db id
    pub id: i32,
    /// option name
    #[sea_orm(unique)]
    pub name: String,
    /// raw value
    pub value: String,
}

/// no relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Reads an option, `None` if it was never set.
pub async fn get<C: ConnectionTrait>(db: &C, name: &str) -> Result<Option<String>, DbErr> {
    Ok(Entity::find()
        .filter(Column::Name.eq(name))
        .one(db)
        .await?
        .map(|option| option.value))
}

/// Creates or replaces an option.
pub async fn set(db: &DatabaseConnection, name: &str, value: &str) -> Result<(), DbErr> {
    let db_txn = db.begin().await?;

    match Entity::find()
        .filter(Column::Name.eq(name))
        .one(&db_txn)
        .await?
    {
        Some(model) => {
            let mut am = model.into_active_model();
            am.value = Set(value.to_string());
            am.update(&db_txn).await?;
        }
        None => {
            ActiveModel {
                name: Set(name.to_string()),
                value: Set(value.to_string()),
                ..Default::default()
            }
            .insert(&db_txn)
            .await?;
        }
    }
    db_txn.commit().await?;

    Ok(())
}

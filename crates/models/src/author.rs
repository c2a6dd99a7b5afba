use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::book;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "author")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Book,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Book => Entity::has_many(book::Entity).into(),
        }
    }
}

impl Related<book::Entity> for Entity {
    fn to() -> RelationDef { Relation::Book.def() }
}

impl ActiveModelBehavior for ActiveModel {}

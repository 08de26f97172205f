use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub description: String,
    /// `YYYY-MM-DDTHH:MM:SS`, see `models::parse_release_date`.
    pub release_date: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::movie_image::Entity")]
    MovieImage,
}

impl Related<super::movie_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MovieImage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(pk_auto(Movies::Id))
                    .col(string(Movies::Title))
                    .col(string(Movies::Description))
                    .col(string(Movies::ReleaseDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieImages::Table)
                    .if_not_exists()
                    .col(pk_auto(MovieImages::Id))
                    .col(string(MovieImages::FilePath))
                    .col(boolean(MovieImages::IsCover).default(false))
                    .col(integer(MovieImages::MovieId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_images_movie_id")
                            .from(MovieImages::Table, MovieImages::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_images_movie_id")
                    .table(MovieImages::Table)
                    .col(MovieImages::MovieId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MovieImages::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    Title,
    Description,
    ReleaseDate,
}

#[derive(DeriveIden)]
enum MovieImages {
    Table,
    Id,
    FilePath,
    IsCover,
    MovieId,
}

//! SQL for artworks and their dependent rows.
//!
//! Writers take a bare `SqliteConnection` so they run equally against a pool
//! connection or an open transaction. Every collection is written with a
//! single multi-row `INSERT`.

use crate::models::artwork::{
    Artwork, ArtworkAttribute, ArtworkDetails, ArtworkImage, Edition,
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

const ARTWORK_COLUMNS: &str = "id, user_id, collection_id, title, description, creation_date, \
     price, is_for_sale, status, type, dimensions, weight, is_framed, condition, medium_id, \
     technique_id, license_type, license_details, view_count, created_at, updated_at";

pub async fn insert_artwork(conn: &mut SqliteConnection, artwork: &Artwork) -> sqlx::Result<()> {
    sqlx::query(&format!(
        "INSERT INTO artworks ({ARTWORK_COLUMNS})
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(artwork.id)
    .bind(artwork.user_id)
    .bind(artwork.collection_id)
    .bind(&artwork.title)
    .bind(&artwork.description)
    .bind(artwork.creation_date)
    .bind(artwork.price)
    .bind(artwork.is_for_sale)
    .bind(artwork.status)
    .bind(artwork.artwork_type)
    .bind(&artwork.dimensions)
    .bind(artwork.weight)
    .bind(artwork.is_framed)
    .bind(artwork.condition)
    .bind(artwork.medium_id)
    .bind(artwork.technique_id)
    .bind(artwork.license_type)
    .bind(&artwork.license_details)
    .bind(artwork.view_count)
    .bind(artwork.created_at)
    .bind(artwork.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn insert_edition(conn: &mut SqliteConnection, edition: &Edition) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO editions (id, artwork_id, edition_number, total_editions, status, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(edition.id)
    .bind(edition.artwork_id)
    .bind(edition.edition_number)
    .bind(edition.total_editions)
    .bind(edition.status)
    .bind(edition.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Which link table a list of plain references goes into.
#[derive(Clone, Copy, Debug)]
pub enum LinkTable {
    Tags,
    Categories,
}

impl LinkTable {
    fn table_and_column(self) -> (&'static str, &'static str) {
        match self {
            LinkTable::Tags => ("artwork_tags", "tag_id"),
            LinkTable::Categories => ("artwork_categories", "category_id"),
        }
    }
}

/// Link `artwork_id` to every id in `ids` with one statement.
pub async fn insert_links(
    conn: &mut SqliteConnection,
    table: LinkTable,
    artwork_id: Uuid,
    ids: &[Uuid],
) -> sqlx::Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let (table, column) = table.table_and_column();
    let now = Utc::now();

    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "INSERT INTO {table} (id, artwork_id, {column}, created_at) "
    ));
    builder.push_values(ids, |mut row, id| {
        row.push_bind(Uuid::new_v4())
            .push_bind(artwork_id)
            .push_bind(*id)
            .push_bind(now);
    });
    builder.build().execute(conn).await?;
    Ok(())
}

pub async fn insert_attributes(
    conn: &mut SqliteConnection,
    artwork_id: Uuid,
    attributes: &[ArtworkAttribute],
) -> sqlx::Result<()> {
    if attributes.is_empty() {
        return Ok(());
    }
    let now = Utc::now();

    let mut builder = QueryBuilder::<Sqlite>::new(
        "INSERT INTO artwork_attributes (id, artwork_id, attribute_id, value, created_at) ",
    );
    builder.push_values(attributes, |mut row, attr| {
        row.push_bind(Uuid::new_v4())
            .push_bind(artwork_id)
            .push_bind(attr.attribute_id)
            .push_bind(&attr.value)
            .push_bind(now);
    });
    builder.build().execute(conn).await?;
    Ok(())
}

pub async fn insert_images(
    conn: &mut SqliteConnection,
    images: &[ArtworkImage],
) -> sqlx::Result<()> {
    if images.is_empty() {
        return Ok(());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(
        "INSERT INTO artwork_images (id, artwork_id, image_url, is_primary, position, created_at) ",
    );
    builder.push_values(images, |mut row, image| {
        row.push_bind(image.id)
            .push_bind(image.artwork_id)
            .push_bind(&image.image_url)
            .push_bind(image.is_primary)
            .push_bind(image.position)
            .push_bind(image.created_at);
    });
    builder.build().execute(conn).await?;
    Ok(())
}

/// Load an artwork with everything that hangs off it. Images come back in
/// submission order, so the primary image is first.
pub async fn fetch_artwork(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<ArtworkDetails>> {
    let artwork = sqlx::query_as::<_, Artwork>(&format!(
        "SELECT {ARTWORK_COLUMNS} FROM artworks WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;

    let Some(artwork) = artwork else {
        return Ok(None);
    };

    let images = sqlx::query_as::<_, ArtworkImage>(
        "SELECT id, artwork_id, image_url, is_primary, position, created_at
         FROM artwork_images WHERE artwork_id = ? ORDER BY position ASC",
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    let editions = sqlx::query_as::<_, Edition>(
        "SELECT id, artwork_id, edition_number, total_editions, status, created_at
         FROM editions WHERE artwork_id = ? ORDER BY edition_number ASC",
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    let tag_ids = sqlx::query_scalar::<_, Uuid>(
        "SELECT tag_id FROM artwork_tags WHERE artwork_id = ? ORDER BY rowid ASC",
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    let category_ids = sqlx::query_scalar::<_, Uuid>(
        "SELECT category_id FROM artwork_categories WHERE artwork_id = ? ORDER BY rowid ASC",
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    let attributes = sqlx::query_as::<_, ArtworkAttribute>(
        "SELECT attribute_id, value FROM artwork_attributes
         WHERE artwork_id = ? ORDER BY rowid ASC",
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    Ok(Some(ArtworkDetails {
        artwork,
        images,
        editions,
        tag_ids,
        category_ids,
        attributes,
    }))
}

/// Artworks owned by `user_id`, newest first.
pub async fn list_artworks_for_user(db: &SqlitePool, user_id: Uuid) -> sqlx::Result<Vec<Artwork>> {
    sqlx::query_as::<_, Artwork>(&format!(
        "SELECT {ARTWORK_COLUMNS} FROM artworks WHERE user_id = ?
         ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

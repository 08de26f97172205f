use jiff::{civil::DateTime, fmt::temporal::DateTimeParser};
use serde::{Deserialize, Deserializer, Serialize};

use crate::entities::{movie, movie_image};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDto {
    #[serde(default)]
    pub movie_id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "unset_release_date", deserialize_with = "deserialize_release_date")]
    pub release_date: DateTime,
    #[serde(default)]
    pub movie_images: Vec<MovieImageDto>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieImageDto {
    #[serde(default)]
    pub movie_image_id: i32,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub is_cover: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSavedResponse {
    pub message: String,
    pub file_path: String,
}

/// A file part pulled out of a multipart upload.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl From<movie_image::Model> for MovieImageDto {
    fn from(img: movie_image::Model) -> Self {
        Self { movie_image_id: img.id, file_path: img.file_path, is_cover: img.is_cover }
    }
}

impl MovieDto {
    pub fn from_model(
        movie: movie::Model,
        images: Vec<movie_image::Model>,
    ) -> Result<Self, jiff::Error> {
        Ok(Self {
            movie_id: movie.id,
            title: movie.title,
            description: movie.description,
            release_date: parse_release_date(&movie.release_date)?,
            movie_images: images.into_iter().map(MovieImageDto::from).collect(),
        })
    }
}

/// Accepts `2021-10-22`, `2021-10-22T20:30:00` or a full RFC 3339 timestamp.
/// Timestamps carrying an offset are normalized to UTC.
pub fn parse_release_date(raw: &str) -> Result<DateTime, jiff::Error> {
    let raw = raw.trim();
    // Civil parsing would silently drop an offset, so try timestamps first.
    match DateTimeParser::new().parse_timestamp(raw.as_bytes()) {
        Ok(ts) => Ok(ts.to_zoned(jiff::tz::TimeZone::UTC).datetime()),
        Err(_) => raw.parse::<DateTime>(),
    }
}

/// Stand-in for an omitted release date: `0001-01-01T00:00:00`.
pub fn unset_release_date() -> DateTime {
    jiff::civil::date(1, 1, 1).at(0, 0, 0, 0)
}

fn deserialize_release_date<'de, D>(deserializer: D) -> Result<DateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_release_date(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn release_date_accepts_plain_dates() {
        let dt = parse_release_date("2021-10-22").unwrap();
        assert_eq!(dt, date(2021, 10, 22).at(0, 0, 0, 0));
    }

    #[test]
    fn release_date_accepts_civil_datetimes() {
        let dt = parse_release_date("2021-10-22T20:30:00").unwrap();
        assert_eq!(dt, date(2021, 10, 22).at(20, 30, 0, 0));
    }

    #[test]
    fn release_date_normalizes_offsets_to_utc() {
        let dt = parse_release_date("2021-10-22T01:00:00+03:00").unwrap();
        assert_eq!(dt, date(2021, 10, 21).at(22, 0, 0, 0));
    }

    #[test]
    fn release_date_rejects_garbage() {
        assert!(parse_release_date("next friday").is_err());
    }

    #[test]
    fn movie_dto_uses_camel_case_and_defaults() {
        let dto: MovieDto =
            serde_json::from_str(r#"{"title":"Dune","releaseDate":"2021-10-22"}"#).unwrap();
        assert_eq!(dto.movie_id, 0);
        assert_eq!(dto.description, "");
        assert!(dto.movie_images.is_empty());

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["releaseDate"], "2021-10-22T00:00:00");
        assert!(json["movieImages"].as_array().unwrap().is_empty());
    }

    #[test]
    fn omitted_release_date_falls_back_to_year_one() {
        let dto: MovieDto = serde_json::from_str(r#"{"title":"Undated"}"#).unwrap();
        assert_eq!(dto.release_date, date(1, 1, 1).at(0, 0, 0, 0));
        assert_eq!(serde_json::to_value(&dto).unwrap()["releaseDate"], "0001-01-01T00:00:00");
        assert_eq!(parse_release_date("0001-01-01T00:00:00").unwrap(), dto.release_date);
    }

    #[test]
    fn image_dto_from_row() {
        let row = movie_image::Model {
            id: 7,
            file_path: "/uploads/a.png".to_string(),
            is_cover: true,
            movie_id: 1,
        };
        let json = serde_json::to_value(MovieImageDto::from(row)).unwrap();
        assert_eq!(json["movieImageId"], 7);
        assert_eq!(json["filePath"], "/uploads/a.png");
        assert_eq!(json["isCover"], true);
    }
}

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::{PgPoolOptions, PgRow};
use survey_contracts::{
    NewSurvey, NewSurveyResponse, ResponseData, ResponseId, Survey, SurveyId, SurveySummary,
};

use crate::{ResponseRecord, StoreError, SurveyStore, UserResponseRecord};

const SURVEY_COLUMNS_WITH_COUNT: &str = "s.id, s.title, s.description, s.created_at, s.updated_at, COUNT(r.id) AS responses_count";
const RESPONSE_COLUMNS: &str =
    "id, survey_id, user_identifier, response_data, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgStoreOptions {
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub query_timeout: Duration,
}

impl Default for PgStoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 8,
            connect_timeout: Duration::from_secs(2),
            query_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Clone)]
pub struct PgSurveyStore {
    pool: sqlx::PgPool,
    query_timeout: Duration,
}

impl PgSurveyStore {
    pub async fn connect(db_url: &str, options: &PgStoreOptions) -> Result<Self, StoreError> {
        let pool = tokio::time::timeout(
            options.connect_timeout,
            PgPoolOptions::new()
                .max_connections(options.max_connections)
                .connect(db_url),
        )
        .await
        .map_err(|_| StoreError::Timeout)??;

        Ok(Self {
            pool,
            query_timeout: options.query_timeout,
        })
    }

    pub async fn connect_and_migrate(
        db_url: &str,
        options: &PgStoreOptions,
    ) -> Result<Self, StoreError> {
        let store = Self::connect(db_url, options).await?;
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        tokio::time::timeout(Duration::from_secs(10), migrate(&self.pool))
            .await
            .map_err(|_| StoreError::Timeout)??;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SurveyStore for PgSurveyStore {
    async fn insert_survey(
        &self,
        survey: &NewSurvey,
        now: DateTime<Utc>,
    ) -> Result<Survey, StoreError> {
        let row = tokio::time::timeout(
            self.query_timeout,
            sqlx::query(
                "INSERT INTO surveys (title, description, created_at, updated_at) VALUES ($1, $2, $3, $3) RETURNING id, title, description, created_at, updated_at, 0::BIGINT AS responses_count",
            )
            .bind(&survey.title)
            .bind(&survey.description)
            .bind(now)
            .fetch_one(&self.pool),
        )
        .await
        .map_err(|_| StoreError::Timeout)??;

        Ok(survey_from_row(&row)?)
    }

    async fn fetch_survey(&self, survey_id: SurveyId) -> Result<Option<Survey>, StoreError> {
        let sql = format!(
            "SELECT {SURVEY_COLUMNS_WITH_COUNT} FROM surveys s LEFT JOIN survey_responses r ON r.survey_id = s.id WHERE s.id = $1 GROUP BY s.id"
        );
        let row = tokio::time::timeout(
            self.query_timeout,
            sqlx::query(&sql).bind(survey_id).fetch_optional(&self.pool),
        )
        .await
        .map_err(|_| StoreError::Timeout)??;

        Ok(row.as_ref().map(survey_from_row).transpose()?)
    }

    async fn list_surveys(&self) -> Result<Vec<Survey>, StoreError> {
        let sql = format!(
            "SELECT {SURVEY_COLUMNS_WITH_COUNT} FROM surveys s LEFT JOIN survey_responses r ON r.survey_id = s.id GROUP BY s.id ORDER BY s.created_at DESC, s.id DESC"
        );
        let rows = tokio::time::timeout(
            self.query_timeout,
            sqlx::query(&sql).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| StoreError::Timeout)??;

        Ok(rows
            .iter()
            .map(survey_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn survey_exists(&self, survey_id: SurveyId) -> Result<bool, StoreError> {
        let exists = tokio::time::timeout(
            self.query_timeout,
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM surveys WHERE id = $1)")
                .bind(survey_id)
                .fetch_one(&self.pool),
        )
        .await
        .map_err(|_| StoreError::Timeout)??;

        Ok(exists)
    }

    async fn insert_response(
        &self,
        survey_id: SurveyId,
        response: &NewSurveyResponse,
        now: DateTime<Utc>,
    ) -> Result<ResponseRecord, StoreError> {
        let sql = format!(
            "INSERT INTO survey_responses (survey_id, user_identifier, response_data, created_at, updated_at) VALUES ($1, $2, $3, $4, $4) RETURNING {RESPONSE_COLUMNS}"
        );
        let row = tokio::time::timeout(
            self.query_timeout,
            sqlx::query(&sql)
                .bind(survey_id)
                .bind(&response.user_identifier)
                .bind(response.response_data.as_str())
                .bind(now)
                .fetch_one(&self.pool),
        )
        .await
        .map_err(|_| StoreError::Timeout)??;

        Ok(response_from_row(&row)?)
    }

    async fn fetch_response(
        &self,
        survey_id: SurveyId,
        response_id: ResponseId,
    ) -> Result<Option<ResponseRecord>, StoreError> {
        let sql = format!(
            "SELECT {RESPONSE_COLUMNS} FROM survey_responses WHERE id = $1 AND survey_id = $2"
        );
        let row = tokio::time::timeout(
            self.query_timeout,
            sqlx::query(&sql)
                .bind(response_id)
                .bind(survey_id)
                .fetch_optional(&self.pool),
        )
        .await
        .map_err(|_| StoreError::Timeout)??;

        Ok(row.as_ref().map(response_from_row).transpose()?)
    }

    async fn list_responses(
        &self,
        survey_id: SurveyId,
    ) -> Result<Vec<ResponseRecord>, StoreError> {
        let sql = format!(
            "SELECT {RESPONSE_COLUMNS} FROM survey_responses WHERE survey_id = $1 ORDER BY updated_at DESC, id DESC"
        );
        let rows = tokio::time::timeout(
            self.query_timeout,
            sqlx::query(&sql).bind(survey_id).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| StoreError::Timeout)??;

        Ok(rows
            .iter()
            .map(response_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_response_data(
        &self,
        survey_id: SurveyId,
        response_id: ResponseId,
        response_data: &ResponseData,
        now: DateTime<Utc>,
    ) -> Result<Option<ResponseRecord>, StoreError> {
        let sql = format!(
            "UPDATE survey_responses SET response_data = $1, updated_at = $2 WHERE id = $3 AND survey_id = $4 RETURNING {RESPONSE_COLUMNS}"
        );
        let row = tokio::time::timeout(
            self.query_timeout,
            sqlx::query(&sql)
                .bind(response_data.as_str())
                .bind(now)
                .bind(response_id)
                .bind(survey_id)
                .fetch_optional(&self.pool),
        )
        .await
        .map_err(|_| StoreError::Timeout)??;

        Ok(row.as_ref().map(response_from_row).transpose()?)
    }

    async fn list_responses_by_user(
        &self,
        user_identifier: &str,
    ) -> Result<Vec<UserResponseRecord>, StoreError> {
        let rows = tokio::time::timeout(
            self.query_timeout,
            sqlx::query(
                "SELECT r.id, r.survey_id, r.user_identifier, r.response_data, r.created_at, r.updated_at, s.title AS survey_title, s.description AS survey_description FROM survey_responses r JOIN surveys s ON s.id = r.survey_id WHERE r.user_identifier = $1 ORDER BY r.updated_at DESC, r.id DESC",
            )
            .bind(user_identifier)
            .fetch_all(&self.pool),
        )
        .await
        .map_err(|_| StoreError::Timeout)??;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let response = response_from_row(row)?;
            let survey = SurveySummary {
                id: response.survey_id,
                title: row.try_get("survey_title")?,
                description: row.try_get("survey_description")?,
            };
            out.push(UserResponseRecord { response, survey });
        }
        Ok(out)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        tokio::time::timeout(
            self.query_timeout,
            sqlx::query("SELECT 1").execute(&self.pool),
        )
        .await
        .map_err(|_| StoreError::Timeout)??;
        Ok(())
    }
}

fn survey_from_row(row: &PgRow) -> Result<Survey, sqlx::Error> {
    Ok(Survey {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        responses_count: row.try_get("responses_count")?,
    })
}

fn response_from_row(row: &PgRow) -> Result<ResponseRecord, sqlx::Error> {
    Ok(ResponseRecord {
        id: row.try_get("id")?,
        survey_id: row.try_get("survey_id")?,
        user_identifier: row.try_get("user_identifier")?,
        response_data: ResponseData::from_json(row.try_get("response_data")?)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn migrate_url(db_url: &str) -> Result<(), StoreError> {
    let pool = sqlx::PgPool::connect(db_url).await?;
    migrate(&pool).await?;
    pool.close().await;
    Ok(())
}

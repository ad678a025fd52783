use crate::{
    error::{AppError, AppResult},
    models::{site_setting, SiteSetting, SiteSettingModel},
};
use sea_orm::{
    sea_query::OnConflict, DatabaseConnection, EntityTrait, QueryOrder, Set, TransactionTrait,
};

pub struct SettingsService {
    db: DatabaseConnection,
}

impl SettingsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<SiteSettingModel>> {
        let settings = SiteSetting::find()
            .order_by_asc(site_setting::Column::Key)
            .all(&self.db)
            .await?;
        Ok(settings)
    }

    pub async fn get(&self, key: &str) -> AppResult<SiteSettingModel> {
        SiteSetting::find_by_id(key)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Insert-or-update a single setting.
    pub async fn upsert(
        &self,
        key: &str,
        value: &str,
        description: Option<String>,
    ) -> AppResult<SiteSettingModel> {
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::Validation(
                "Setting key cannot be empty".to_string(),
            ));
        }

        let model = site_setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            description: Set(description),
            updated_at: Set(chrono::Utc::now().naive_utc()),
        };

        SiteSetting::insert(model)
            .on_conflict(
                OnConflict::column(site_setting::Column::Key)
                    .update_columns([
                        site_setting::Column::Value,
                        site_setting::Column::Description,
                        site_setting::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        self.get(key).await
    }

    /// Bulk upsert in one transaction: either all settings apply or none.
    pub async fn upsert_many(&self, items: &[(String, String, Option<String>)]) -> AppResult<()> {
        let txn = self.db.begin().await?;
        let now = chrono::Utc::now().naive_utc();

        for (key, value, description) in items {
            let key = key.trim();
            if key.is_empty() {
                return Err(AppError::Validation(
                    "Setting key cannot be empty".to_string(),
                ));
            }

            let model = site_setting::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value.to_string()),
                description: Set(description.clone()),
                updated_at: Set(now),
            };

            SiteSetting::insert(model)
                .on_conflict(
                    OnConflict::column(site_setting::Column::Key)
                        .update_columns([
                            site_setting::Column::Value,
                            site_setting::Column::Description,
                            site_setting::Column::UpdatedAt,
                        ])
                        .to_owned(),
                )
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }
}

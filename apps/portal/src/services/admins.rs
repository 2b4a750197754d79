use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::api_client::{ApiClient, ApiRequest};
use crate::errors::{ApiError, ApiResult};
use crate::models::{Admin, AdminForm};
use crate::view::{ListQuery, ListResult, PageSource};

pub async fn list_admins(api: &ApiClient) -> ApiResult<Vec<Admin>> {
    api.send_json(ApiRequest::get("/api/v1/all-admins").auth())
        .await
}

pub async fn create_admin(api: &ApiClient, form: &AdminForm) -> ApiResult<Admin> {
    form.validate()?;
    let admin: Admin = api
        .send_json(ApiRequest::post("/api/v1/create-admin").auth().json(form_body(form)?))
        .await?;
    info!("Created admin {} ({})", admin.username, admin.id);
    Ok(admin)
}

pub async fn update_admin(api: &ApiClient, admin_id: i64, form: &AdminForm) -> ApiResult<Admin> {
    form.validate()?;
    api.send_json(
        ApiRequest::put(format!("/api/v1/update-admin/{admin_id}"))
            .auth()
            .json(form_body(form)?),
    )
    .await
}

pub async fn delete_admin(api: &ApiClient, admin_id: i64) -> ApiResult<()> {
    api.send(ApiRequest::delete(format!("/api/v1/delete-admin/{admin_id}")).auth())
        .await?;
    info!("Deleted admin {admin_id}");
    Ok(())
}

/// Drops `admin_id` from a loaded list after a successful delete.
pub fn without_admin(admins: &[Admin], admin_id: i64) -> Vec<Admin> {
    admins.iter().filter(|a| a.id != admin_id).cloned().collect()
}

fn form_body(form: &AdminForm) -> ApiResult<Value> {
    serde_json::to_value(form).map_err(|e| ApiError::validation(e.to_string()))
}

#[derive(Clone)]
pub struct AdminSource {
    api: ApiClient,
}

impl AdminSource {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PageSource<Admin> for AdminSource {
    async fn fetch_page(&self, _query: &ListQuery) -> ApiResult<ListResult<Admin>> {
        Ok(ListResult::single_page(list_admins(&self.api).await?))
    }
}

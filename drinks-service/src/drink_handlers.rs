use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use common_auth::AuthContext;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{query, query_as};
use tracing::debug;

use crate::api_error::{ApiError, ApiResult};
use crate::app_state::AppState;

pub const SCOPE_READ_DETAIL: &str = "get:drinks-detail";
pub const SCOPE_CREATE: &str = "post:drinks";
pub const SCOPE_UPDATE: &str = "patch:drinks";
pub const SCOPE_DELETE: &str = "delete:drinks";

#[derive(Debug, sqlx::FromRow)]
pub struct Drink {
    pub id: i64,
    pub title: String,
    pub recipe: Value,
}

impl Drink {
    /// Public projection: recipe entries reduced to color and proportion,
    /// without ingredient names.
    fn short(&self) -> Value {
        let recipe = match &self.recipe {
            Value::Array(parts) => Value::Array(
                parts
                    .iter()
                    .map(|part| {
                        json!({
                            "color": part.get("color").cloned().unwrap_or(Value::Null),
                            "parts": part.get("parts").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect(),
            ),
            other => other.clone(),
        };
        json!({ "id": self.id, "title": self.title, "recipe": recipe })
    }

    fn long(&self) -> Value {
        json!({ "id": self.id, "title": self.title, "recipe": self.recipe })
    }
}

/// Body rejections keep the standard envelope; serde's message is logged
/// rather than echoed to the client.
fn body_error(rejection: JsonRejection) -> ApiError {
    debug!(detail = %rejection.body_text(), "request body rejected");
    ApiError::Unprocessable {
        code: "invalid_body",
        message: Some("request body must be a JSON object with the expected fields".into()),
    }
}

fn db_error(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db) = &err {
        // Postgres unique_violation; the only unique constraint is the title.
        if db.code().as_deref() == Some("23505") {
            return ApiError::Conflict {
                code: "drink_title_taken",
                message: Some("a drink with this title already exists".into()),
            };
        }
    }
    ApiError::internal(err)
}

pub async fn list_drinks(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let drinks = query_as::<_, Drink>("SELECT id, title, recipe FROM drinks ORDER BY id DESC")
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(json!({
        "success": true,
        "drinks": drinks.iter().map(Drink::short).collect::<Vec<_>>(),
    })))
}

pub async fn list_drinks_detail(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Value>> {
    debug!(subject = ?auth.claims.subject, "detail listing requested");
    let drinks = query_as::<_, Drink>("SELECT id, title, recipe FROM drinks ORDER BY id DESC")
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(json!({
        "success": true,
        "drinks": drinks.iter().map(Drink::long).collect::<Vec<_>>(),
    })))
}

#[derive(Deserialize)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Value,
}

pub async fn create_drink(
    State(state): State<AppState>,
    auth: AuthContext,
    body: Result<Json<NewDrink>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(new_drink) = body.map_err(body_error)?;
    if new_drink.title.trim().is_empty() {
        return Err(ApiError::Unprocessable {
            code: "missing_title",
            message: Some("title must not be empty".into()),
        });
    }
    if !new_drink.recipe.is_array() {
        return Err(ApiError::Unprocessable {
            code: "invalid_recipe",
            message: Some("recipe must be an array of ingredient parts".into()),
        });
    }

    let drink = query_as::<_, Drink>(
        "INSERT INTO drinks (title, recipe) VALUES ($1, $2) RETURNING id, title, recipe",
    )
    .bind(&new_drink.title)
    .bind(&new_drink.recipe)
    .fetch_one(&state.db)
    .await
    .map_err(db_error)?;

    debug!(subject = ?auth.claims.subject, drink_id = drink.id, "drink created");
    Ok(Json(json!({ "success": true, "drinks": [drink.long()] })))
}

#[derive(Deserialize, Default)]
pub struct UpdateDrink {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub recipe: Option<Value>,
}

pub async fn update_drink(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(drink_id): Path<i64>,
    body: Result<Json<UpdateDrink>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(upd) = body.map_err(body_error)?;
    if let Some(title) = &upd.title {
        if title.trim().is_empty() {
            return Err(ApiError::Unprocessable {
                code: "missing_title",
                message: Some("title must not be empty".into()),
            });
        }
    }
    if let Some(recipe) = &upd.recipe {
        if !recipe.is_array() {
            return Err(ApiError::Unprocessable {
                code: "invalid_recipe",
                message: Some("recipe must be an array of ingredient parts".into()),
            });
        }
    }

    let drink = query_as::<_, Drink>(
        "UPDATE drinks SET title = COALESCE($1, title), recipe = COALESCE($2, recipe)
         WHERE id = $3
         RETURNING id, title, recipe",
    )
    .bind(upd.title)
    .bind(upd.recipe)
    .bind(drink_id)
    .fetch_optional(&state.db)
    .await
    .map_err(db_error)?;

    let Some(drink) = drink else {
        return Err(ApiError::NotFound {
            code: "drink_not_found",
        });
    };

    debug!(subject = ?auth.claims.subject, drink_id, "drink updated");
    Ok(Json(json!({ "success": true, "drinks": [drink.long()] })))
}

pub async fn delete_drink(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(drink_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let result = query("DELETE FROM drinks WHERE id = $1")
        .bind(drink_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::internal)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound {
            code: "drink_not_found",
        });
    }

    debug!(subject = ?auth.claims.subject, drink_id, "drink deleted");
    Ok(Json(json!({ "success": true, "deleted": drink_id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_projection_drops_ingredient_names() {
        let drink = Drink {
            id: 1,
            title: "matcha latte".into(),
            recipe: json!([
                {"name": "milk", "color": "white", "parts": 3},
                {"name": "matcha", "color": "green", "parts": 1}
            ]),
        };

        let short = drink.short();
        assert_eq!(
            short["recipe"],
            json!([
                {"color": "white", "parts": 3},
                {"color": "green", "parts": 1}
            ])
        );
        assert_eq!(short["title"], json!("matcha latte"));
    }

    #[test]
    fn long_projection_keeps_full_recipe() {
        let recipe = json!([{"name": "espresso", "color": "brown", "parts": 1}]);
        let drink = Drink {
            id: 7,
            title: "espresso".into(),
            recipe: recipe.clone(),
        };

        let long = drink.long();
        assert_eq!(long["recipe"], recipe);
        assert_eq!(long["id"], json!(7));
    }
}

use std::convert::Infallible;

use serde::Serialize;
use warp::{http::StatusCode, reply::Response, Rejection, Reply};

use crate::{error::ApiError, report::ShoppingListFile};

impl Reply for ShoppingListFile {
    fn into_response(self) -> Response {
        let disposition = self.content_disposition();
        let reply = warp::reply::with_header(
            self.body,
            "content-type",
            format!("{}; charset=utf-8", self.content_type),
        );

        warp::reply::with_header(reply, "content-disposition", disposition).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorBody {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

pub fn reject(error: ApiError) -> Rejection {
    warp::reject::custom(error)
}

/// Serializes a successful result as JSON, or rejects with the error.
pub fn json_reply<T: Serialize>(result: Result<T, ApiError>) -> Result<warp::reply::Json, Rejection> {
    result.map(|value| warp::reply::json(&value)).map_err(reject)
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message, field) = if let Some(e) = err.find::<ApiError>() {
        (e.status(), e.to_string(), e.field().map(str::to_string))
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, String::from("Not found"), None)
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("Internal server error"),
            None,
        )
    };

    let body = warp::reply::json(&ErrorBody {
        code: status.as_u16(),
        message,
        field,
    });

    Ok(warp::reply::with_status(body, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = warp::hyper::body::to_bytes(response.into_body())
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn shopping_list_is_sent_as_attachment() {
        let file = ShoppingListFile::new("alice", String::from("- Egg (pcs) - 2\n"));

        let response = file.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"alice_shopping_list.txt\""
        );
    }

    #[tokio::test]
    async fn empty_cart_rejection_is_a_bad_request() {
        let response = handle_rejection(reject(ApiError::EmptyCart))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], 400);
        assert!(body.get("field").is_none());
    }

    #[tokio::test]
    async fn validation_rejection_names_the_field() {
        let error = ApiError::validation("tags", "tags must not be duplicated");

        let response = handle_rejection(reject(error)).await.unwrap().into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["field"], "tags");
    }

    #[tokio::test]
    async fn conflict_and_not_found_keep_their_status() {
        let conflict = handle_rejection(reject(ApiError::conflict("already in favorites")))
            .await
            .unwrap()
            .into_response();
        let missing = handle_rejection(warp::reject::not_found())
            .await
            .unwrap()
            .into_response();

        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn json_reply_rejects_errors() {
        assert!(json_reply::<()>(Err(ApiError::Unauthorized)).is_err());
        assert!(json_reply(Ok(vec![1, 2, 3])).is_ok());
    }
}

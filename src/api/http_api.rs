//! REST transport for the board API.
//!
//! Maps each `BoardApi` method onto its endpoint and translates
//! non-success statuses into `TaskboardError` values: 404 becomes
//! `NotFound`, 400/422 become `Validation` with the field messages from the
//! problem-details body, anything else becomes `Http`.

use crate::{
    api::BoardApi,
    config::ClientConfig,
    domain::{Board, BoardId, Card, CardId, Column, ColumnId, MoveCardRequest},
    error::{Result, TaskboardError},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Key used for validation messages that are not tied to a field
pub const GENERAL_ERROR_KEY: &str = "";

/// ASP.NET-style problem details, only the parts we surface
#[derive(Debug, Deserialize)]
struct ProblemDetails {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, Vec<String>>,
}

/// What a request is about, for error reporting
#[derive(Debug, Clone, Copy)]
struct Target {
    entity: &'static str,
    id: i64,
}

impl Target {
    fn new(entity: &'static str, id: impl Into<i64>) -> Self {
        Self {
            entity,
            id: id.into(),
        }
    }

    fn collection(entity: &'static str) -> Self {
        Self { entity, id: 0 }
    }
}

/// `BoardApi` over HTTP
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    root: Url,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            root: config.api_root()?,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.root
            .join(path)
            .map_err(|e| TaskboardError::Config(format!("invalid request path '{}': {}", path, e)))
    }

    async fn send(&self, request: RequestBuilder, target: Target) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), entity = target.entity, "response received");

        if status.is_success() {
            Ok(response)
        } else {
            Err(Self::error_for(response, target).await)
        }
    }

    async fn error_for(response: Response, target: Target) -> TaskboardError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::NOT_FOUND => TaskboardError::NotFound {
                entity: target.entity,
                id: target.id,
            },
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                TaskboardError::Validation {
                    status: status.as_u16(),
                    errors: parse_validation_errors(&body),
                }
            }
            _ => TaskboardError::Http {
                status: status.as_u16(),
                body,
            },
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Reads a body that the server may leave empty
    async fn read_optional<T: DeserializeOwned>(response: Response) -> Result<Option<T>> {
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

/// Extracts field messages from a 400/422 body
///
/// Falls back to the problem title, then to the raw body, under
/// `GENERAL_ERROR_KEY` so a message is always available to show.
pub fn parse_validation_errors(body: &str) -> BTreeMap<String, Vec<String>> {
    let mut errors = BTreeMap::new();
    match serde_json::from_str::<ProblemDetails>(body) {
        Ok(details) if !details.errors.is_empty() => return details.errors,
        Ok(ProblemDetails {
            title: Some(title), ..
        }) => {
            errors.insert(GENERAL_ERROR_KEY.to_string(), vec![title]);
        }
        _ if !body.trim().is_empty() => {
            errors.insert(GENERAL_ERROR_KEY.to_string(), vec![body.trim().to_string()]);
        }
        _ => {}
    }
    errors
}

#[async_trait]
impl BoardApi for HttpApi {
    #[instrument(skip(self))]
    async fn list_boards(&self) -> Result<Vec<Board>> {
        let request = self.client.get(self.url("boards")?);
        let response = self.send(request, Target::collection("Board")).await?;
        Self::read_json(response).await
    }

    #[instrument(skip(self))]
    async fn get_board(&self, id: BoardId) -> Result<Board> {
        let request = self.client.get(self.url(&format!("boards/{}", id))?);
        let response = self.send(request, Target::new("Board", id.value())).await?;
        Self::read_json(response).await
    }

    #[instrument(skip(self, board), fields(title = %board.title))]
    async fn create_board(&self, board: &Board) -> Result<Board> {
        let request = self.client.post(self.url("boards")?).json(board);
        let response = self.send(request, Target::collection("Board")).await?;
        Self::read_json(response).await
    }

    #[instrument(skip(self, board))]
    async fn update_board(&self, id: BoardId, board: &Board) -> Result<()> {
        let request = self
            .client
            .put(self.url(&format!("boards/{}", id))?)
            .json(board);
        self.send(request, Target::new("Board", id.value())).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_board(&self, id: BoardId) -> Result<()> {
        let request = self.client.delete(self.url(&format!("boards/{}", id))?);
        self.send(request, Target::new("Board", id.value())).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_columns(&self, board_id: BoardId) -> Result<Vec<Column>> {
        let request = self
            .client
            .get(self.url(&format!("columns/ByBoard/{}", board_id))?);
        let response = self
            .send(request, Target::new("Board", board_id.value()))
            .await?;
        Self::read_json(response).await
    }

    #[instrument(skip(self, column), fields(board_id = %column.board_id, order = column.order))]
    async fn create_column(&self, column: &Column) -> Result<Column> {
        let request = self.client.post(self.url("columns")?).json(column);
        let response = self.send(request, Target::collection("Column")).await?;
        Self::read_json(response).await
    }

    #[instrument(skip(self, column))]
    async fn update_column(&self, id: ColumnId, column: &Column) -> Result<()> {
        let request = self
            .client
            .put(self.url(&format!("columns/{}", id))?)
            .json(column);
        self.send(request, Target::new("Column", id.value())).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_column(&self, id: ColumnId) -> Result<()> {
        let request = self.client.delete(self.url(&format!("columns/{}", id))?);
        self.send(request, Target::new("Column", id.value())).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reorder_column(&self, id: ColumnId, new_order: i32) -> Result<()> {
        let request = self
            .client
            .patch(self.url(&format!("columns/{}/Reorder", id))?)
            .json(&new_order);
        self.send(request, Target::new("Column", id.value())).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_cards(&self, column_id: ColumnId) -> Result<Vec<Card>> {
        let request = self
            .client
            .get(self.url(&format!("cards/ByColumn/{}", column_id))?);
        let response = self
            .send(request, Target::new("Column", column_id.value()))
            .await?;
        Self::read_json(response).await
    }

    #[instrument(skip(self, card), fields(column_id = %card.column_id))]
    async fn create_card(&self, card: &Card) -> Result<Card> {
        let request = self.client.post(self.url("cards")?).json(card);
        let response = self.send(request, Target::collection("Card")).await?;
        Self::read_json(response).await
    }

    #[instrument(skip(self, card))]
    async fn update_card(&self, id: CardId, card: &Card) -> Result<Option<Card>> {
        let request = self
            .client
            .put(self.url(&format!("cards/{}", id))?)
            .json(card);
        let response = self.send(request, Target::new("Card", id.value())).await?;
        Self::read_optional(response).await
    }

    #[instrument(skip(self))]
    async fn delete_card(&self, id: CardId) -> Result<()> {
        let request = self.client.delete(self.url(&format!("cards/{}", id))?);
        self.send(request, Target::new("Card", id.value())).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn move_card(&self, id: CardId, request: &MoveCardRequest) -> Result<Option<Card>> {
        let builder = self
            .client
            .patch(self.url(&format!("cards/{}/Move", id))?)
            .json(request);
        let response = self.send(builder, Target::new("Card", id.value())).await?;
        Self::read_optional(response).await
    }
}

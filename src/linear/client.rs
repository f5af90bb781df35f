use async_trait::async_trait;
use graphql_client::{GraphQLQuery, Response as GraphQLResponse};
use indexmap::IndexMap;
use log::trace;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Client;
use url::Url;

use crate::auth::LinearToken;
use crate::error::GatewayError;
use crate::gateway::{GatewayResult, IssueTracker};
use crate::model::IssueAttachment;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "src/linear/schema.graphql",
    query_path = "src/linear/issue_view_for_attachment_url.graphql",
    response_derives = "Debug"
)]
pub struct IssueViewForAttachmentUrl;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "src/linear/schema.graphql",
    query_path = "src/linear/create_comment.graphql",
    response_derives = "Debug"
)]
pub struct CreateComment;

pub struct LinearClient {
    client: Client,
    graphql_url: Url,
    authorization: HeaderValue,
}

impl LinearClient {
    pub fn new(graphql_url: &str, token: &LinearToken) -> GatewayResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("deployed-prs/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let graphql_url = Url::parse(graphql_url)
            .map_err(|e| GatewayError::InvalidUrl(format!("{graphql_url}: {e}")))?;

        let mut authorization = HeaderValue::from_str(&token.authorization_header())
            .map_err(|e| GatewayError::InvalidHeader(format!("Linear token: {e}")))?;
        authorization.set_sensitive(true);

        Ok(Self {
            client,
            graphql_url,
            authorization,
        })
    }

    /// Execute a GraphQL operation and return its data after checking for errors.
    async fn execute<Q>(&self, variables: Q::Variables) -> GatewayResult<Q::ResponseData>
    where
        Q: GraphQLQuery,
    {
        let request_body = Q::build_query(variables);
        let operation = request_body.operation_name.to_string();

        let response = self
            .client
            .post(self.graphql_url.clone())
            .header(AUTHORIZATION, self.authorization.clone())
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response_body: GraphQLResponse<Q::ResponseData> = response.json().await?;

        if let Some(errors) = response_body.errors.filter(|errors| !errors.is_empty()) {
            return Err(GatewayError::GraphQl {
                operation,
                errors: errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        response_body
            .data
            .ok_or(GatewayError::NoResponseData(operation))
    }
}

#[async_trait]
impl IssueTracker for LinearClient {
    async fn find_issues_by_attachment_url(
        &self,
        url: &str,
        comment_body: &str,
    ) -> GatewayResult<Vec<IssueAttachment>> {
        let data = self
            .execute::<IssueViewForAttachmentUrl>(issue_view_for_attachment_url::Variables {
                url: url.to_string(),
                comment_body: comment_body.to_string(),
            })
            .await?;

        trace!(
            "Linear returned {} attachments for {url}",
            data.attachments_for_url.nodes.len()
        );

        // An issue can carry the same link more than once.
        let mut issues: IndexMap<String, IssueAttachment> = IndexMap::new();
        for attachment in data.attachments_for_url.nodes {
            let issue = attachment.issue;
            issues
                .entry(issue.id.clone())
                .or_insert_with(|| IssueAttachment {
                    issue_id: issue.id,
                    issue_identifier: issue.identifier,
                    matching_comment_ids: issue
                        .comments
                        .nodes
                        .into_iter()
                        .map(|comment| comment.id)
                        .collect(),
                });
        }

        Ok(issues.into_values().collect())
    }

    async fn create_comment(&self, issue_id: &str, body: &str) -> GatewayResult<()> {
        let data = self
            .execute::<CreateComment>(create_comment::Variables {
                issue_id: issue_id.to_string(),
                body: body.to_string(),
            })
            .await?;

        if !data.comment_create.success {
            return Err(GatewayError::Rejected {
                operation: "commentCreate".to_string(),
            });
        }

        Ok(())
    }
}

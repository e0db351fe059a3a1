use super::RestRequest;
use crate::protocol::http::{BuildStrategy, HttpParser};
use reqwest::Client;
use url::Url;

/// Configurable Http REST client. Generic over the signing [`BuildStrategy`] (eg/
/// [`crate::protocol::http::public::PublicNoHeaders`] or
/// [`crate::protocol::http::private::RequestSigner`]) and the [`HttpParser`] used to decode
/// responses and API-level errors.
#[derive(Debug, Clone)]
pub struct RestClient<Strategy, Parser> {
    http_client: Client,
    base_url: Url,
    build_strategy: Strategy,
    parser: Parser,
}

impl<Strategy, Parser> RestClient<Strategy, Parser>
where
    Strategy: BuildStrategy,
    Parser: HttpParser,
{
    pub fn new(base_url: Url, build_strategy: Strategy, parser: Parser) -> Self {
        Self {
            http_client: Client::new(),
            base_url,
            build_strategy,
            parser,
        }
    }

    pub async fn execute<Request>(&self, request: Request) -> Result<Request::Response, Parser::OutputError>
    where
        Request: RestRequest,
    {
        let url = self
            .base_url
            .join(&request.path())
            .expect("RestRequest::path must be a valid relative url");

        let mut builder = self.http_client.request(Request::method(), url).timeout(Request::timeout());

        if let Some(query) = request.query_params() {
            builder = builder.query(query);
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let http_request = self
            .build_strategy
            .build(request, builder)
            .map_err(Parser::OutputError::from)?;

        let response = self
            .http_client
            .execute(http_request)
            .await
            .map_err(|error| Parser::OutputError::from(crate::error::SocketError::from(error)))?;

        let status = response.status();
        let payload = response
            .bytes()
            .await
            .map_err(|error| Parser::OutputError::from(crate::error::SocketError::from(error)))?;

        self.parser.parse(status, &payload)
    }
}

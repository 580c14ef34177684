//! Printify REST client: shops, catalog listing, image uploads and orders.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Deserializer, Serialize};

use super::{ClientError, decode_json};
use crate::config::PrintifyConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Printify sends numeric ids; the store keeps every external id as a string.
pub fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct Shop {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductPage {
    pub current_page: u32,
    pub last_page: Option<u32>,
    #[serde(default)]
    pub next_page_url: Option<String>,
    #[serde(default)]
    pub data: Vec<PrintifyProduct>,
}

impl ProductPage {
    pub fn is_last(&self) -> bool {
        self.data.is_empty()
            || self.last_page.is_some_and(|last| self.current_page >= last)
            || self.next_page_url.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrintifyProduct {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<PrintifyImage>,
    #[serde(default)]
    pub options: Vec<serde_json::Value>,
    #[serde(default)]
    pub variants: Vec<PrintifyVariant>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub visible: bool,
    pub blueprint_id: Option<i32>,
    pub print_provider_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrintifyImage {
    pub src: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrintifyVariant {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: i64,
    pub sku: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default)]
    pub options: Vec<i64>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
struct UploadImageRequest<'a> {
    file_name: &'a str,
    contents: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedImage {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub file_name: Option<String>,
    pub preview_url: Option<String>,
}

/// Body of `POST /shops/{shop_id}/orders.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintifyOrderRequest {
    pub external_id: String,
    pub label: String,
    pub line_items: Vec<PrintifyLineItem>,
    pub shipping_method: u32,
    pub send_shipping_notification: bool,
    pub address_to: PrintifyAddress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrintifyLineItem {
    /// A design placed onto a blueprint at order time.
    Custom {
        blueprint_id: i32,
        print_provider_id: i32,
        variant_id: i64,
        quantity: u32,
        print_areas: BTreeMap<String, Vec<PlacedImage>>,
    },
    /// An existing product from the shop catalog.
    Catalog {
        product_id: String,
        variant_id: i64,
        quantity: u32,
    },
}

/// Image placement on a print area; coordinates are normalized to 0..=1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedImage {
    pub src: String,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub angle: f64,
}

impl PlacedImage {
    pub fn centered(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            x: 0.5,
            y: 0.5,
            scale: 1.0,
            angle: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintifyAddress {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub region: String,
    pub address1: String,
    pub city: String,
    pub zip: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedOrder {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
}

#[async_trait]
pub trait PrintProvider: Send + Sync {
    fn shop_id(&self) -> &str;

    async fn list_shops(&self) -> Result<Vec<Shop>, ClientError>;

    async fn list_products(&self, page: u32, limit: u32) -> Result<ProductPage, ClientError>;

    async fn get_product(&self, product_id: &str) -> Result<PrintifyProduct, ClientError>;

    /// `contents_base64` may still carry a `data:...;base64,` prefix.
    async fn upload_image(
        &self,
        file_name: &str,
        contents_base64: &str,
    ) -> Result<UploadedImage, ClientError>;

    async fn create_order(&self, order: &PrintifyOrderRequest)
    -> Result<CreatedOrder, ClientError>;
}

#[derive(Clone)]
pub struct PrintifyClient {
    client: reqwest::Client,
    base_url: String,
    shop_id: String,
}

impl PrintifyClient {
    /// Build a client; when no shop id is configured the first shop on the
    /// account is used.
    pub async fn connect(config: &PrintifyConfig) -> Result<Self, ClientError> {
        let mut client = Self::with_shop(config, config.shop_id.clone().unwrap_or_default())?;
        if client.shop_id.is_empty() {
            let shops = client.list_shops().await?;
            let shop = shops.into_iter().next().ok_or_else(|| {
                ClientError::InvalidRequest("no shops on this Printify account".to_string())
            })?;
            tracing::info!(shop_id = %shop.id, title = %shop.title, "using first printify shop");
            client.shop_id = shop.id;
        }
        Ok(client)
    }

    pub fn with_shop(config: &PrintifyConfig, shop_id: String) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.api_token.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| ClientError::InvalidRequest(format!("invalid API token: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            shop_id,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl PrintProvider for PrintifyClient {
    fn shop_id(&self) -> &str {
        &self.shop_id
    }

    async fn list_shops(&self) -> Result<Vec<Shop>, ClientError> {
        tracing::info!("fetching printify shops");
        let response = self.client.get(self.url("shops.json")).send().await?;
        decode_json(response).await
    }

    async fn list_products(&self, page: u32, limit: u32) -> Result<ProductPage, ClientError> {
        tracing::info!(shop_id = %self.shop_id, page, limit, "fetching printify products");
        let response = self
            .client
            .get(self.url(&format!("shops/{}/products.json", self.shop_id)))
            .query(&[("page", page), ("limit", limit)])
            .send()
            .await?;
        decode_json(response).await
    }

    async fn get_product(&self, product_id: &str) -> Result<PrintifyProduct, ClientError> {
        if product_id.is_empty() {
            return Err(ClientError::InvalidRequest(
                "product id is required".to_string(),
            ));
        }
        let response = self
            .client
            .get(self.url(&format!(
                "shops/{}/products/{}.json",
                self.shop_id,
                urlencoding::encode(product_id)
            )))
            .send()
            .await?;
        decode_json(response).await
    }

    async fn upload_image(
        &self,
        file_name: &str,
        contents_base64: &str,
    ) -> Result<UploadedImage, ClientError> {
        if file_name.is_empty() || contents_base64.is_empty() {
            return Err(ClientError::InvalidRequest(
                "file name and base64 content are required".to_string(),
            ));
        }
        let contents = strip_data_url_prefix(contents_base64);
        tracing::info!(file_name, "uploading image to printify");

        let response = self
            .client
            .post(self.url("uploads/images.json"))
            .timeout(UPLOAD_TIMEOUT)
            .json(&UploadImageRequest {
                file_name,
                contents,
            })
            .send()
            .await?;
        decode_json(response).await
    }

    async fn create_order(
        &self,
        order: &PrintifyOrderRequest,
    ) -> Result<CreatedOrder, ClientError> {
        if order.line_items.is_empty() {
            return Err(ClientError::InvalidRequest(
                "order has no line items".to_string(),
            ));
        }
        tracing::info!(shop_id = %self.shop_id, external_id = %order.external_id, "creating printify order");
        let response = self
            .client
            .post(self.url(&format!("shops/{}/orders.json", self.shop_id)))
            .json(order)
            .send()
            .await?;
        decode_json(response).await
    }
}

/// Drops a `data:image/png;base64,` style prefix if present.
pub fn strip_data_url_prefix(contents: &str) -> &str {
    if contents.starts_with("data:") {
        contents
            .split_once(";base64,")
            .map_or(contents, |(_, payload)| payload)
    } else {
        contents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, shop_id: Option<&str>) -> PrintifyConfig {
        PrintifyConfig {
            api_token: SecretString::from("token".to_string()),
            shop_id: shop_id.map(str::to_string),
            base_url: server.uri(),
        }
    }

    #[test]
    fn strips_data_url_prefix() {
        assert_eq!(strip_data_url_prefix("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url_prefix("AAAA"), "AAAA");
    }

    #[test]
    fn line_items_serialize_in_printify_shape() {
        let catalog = PrintifyLineItem::Catalog {
            product_id: "p1".into(),
            variant_id: 42,
            quantity: 2,
        };
        assert_eq!(
            serde_json::to_value(&catalog).unwrap(),
            serde_json::json!({ "product_id": "p1", "variant_id": 42, "quantity": 2 })
        );

        let mut areas = BTreeMap::new();
        areas.insert("front".to_string(), vec![PlacedImage::centered("https://img")]);
        let custom = PrintifyLineItem::Custom {
            blueprint_id: 6,
            print_provider_id: 29,
            variant_id: 12,
            quantity: 1,
            print_areas: areas,
        };
        let value = serde_json::to_value(&custom).unwrap();
        assert_eq!(value["print_areas"]["front"][0]["x"], 0.5);
        assert_eq!(value["print_provider_id"], 29);
    }

    #[tokio::test]
    async fn connect_discovers_first_shop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shops.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 18789476, "title": "Hoxobil", "sales_channel": "custom_integration" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = PrintifyClient::connect(&config_for(&server, None))
            .await
            .expect("client");
        assert_eq!(client.shop_id(), "18789476");
    }

    #[tokio::test]
    async fn list_products_pages_and_parses_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shops/55/products.json"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current_page": 1,
                "last_page": 1,
                "next_page_url": null,
                "data": [{
                    "id": "abc",
                    "title": "Classic Tee",
                    "images": [{ "src": "https://img/1.png" }],
                    "options": [],
                    "variants": [{ "id": 101, "title": "Black / L", "price": 2000, "options": [1, 2] }],
                    "visible": true,
                    "blueprint_id": 6,
                    "print_provider_id": 29
                }]
            })))
            .mount(&server)
            .await;

        let client = PrintifyClient::connect(&config_for(&server, Some("55")))
            .await
            .expect("client");
        let page = client.list_products(1, 100).await.expect("page");
        assert!(page.is_last());
        assert_eq!(page.data[0].variants[0].id, "101");
        assert_eq!(page.data[0].variants[0].options, vec![1, 2]);
    }

    #[tokio::test]
    async fn upload_sends_stripped_contents() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/uploads/images.json"))
            .and(body_partial_json(serde_json::json!({ "contents": "AAAA" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "img-1",
                "file_name": "design.png",
                "preview_url": "https://images.printify.com/img-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = PrintifyClient::connect(&config_for(&server, Some("55")))
            .await
            .expect("client");
        let uploaded = client
            .upload_image("design.png", "data:image/png;base64,AAAA")
            .await
            .expect("upload");
        assert_eq!(uploaded.id, "img-1");
    }

    #[tokio::test]
    async fn create_order_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shops/55/orders.json"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad variant"))
            .mount(&server)
            .await;

        let client = PrintifyClient::connect(&config_for(&server, Some("55")))
            .await
            .expect("client");
        let order = PrintifyOrderRequest {
            external_id: "R1".into(),
            label: "R1".into(),
            line_items: vec![PrintifyLineItem::Catalog {
                product_id: "abc".into(),
                variant_id: 101,
                quantity: 1,
            }],
            shipping_method: 1,
            send_shipping_notification: false,
            address_to: PrintifyAddress {
                first_name: "Ada".into(),
                last_name: "Obi".into(),
                email: "ada@example.com".into(),
                phone: String::new(),
                country: "NG".into(),
                region: "Lagos".into(),
                address1: "1 Marina".into(),
                city: "Lagos".into(),
                zip: String::new(),
            },
        };
        let err = client.create_order(&order).await.expect_err("api error");
        assert!(matches!(err, ClientError::Api { status: 422, .. }));
    }
}

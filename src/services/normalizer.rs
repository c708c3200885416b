// src/services/normalizer.rs

//! Post body normalization into ordered text/image/video segments.

use reqwest::header::HeaderMap;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ContentSegment, PostKey};
use crate::services::{MediaStore, Ocr};
use crate::utils::{parse_selector, resolve_url};

/// Image attributes checked in order; lazy-loading boards use the data-* ones.
const IMAGE_SOURCE_ATTRS: [&str; 3] = ["src", "data-src", "data-original"];

/// Where a site keeps its post body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLayout {
    /// Selector for the body container (first match wins)
    pub container: &'static str,
    /// Selector for content blocks inside the container
    pub blocks: &'static str,
    /// Blocks whose text is kept; other blocks only contribute media
    pub text_blocks: &'static str,
}

impl BodyLayout {
    /// Layout where every block may carry text.
    pub const fn uniform(container: &'static str, blocks: &'static str) -> Self {
        Self {
            container,
            blocks,
            text_blocks: blocks,
        }
    }
}

/// A body block classified before any media is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyNode {
    Text(String),
    Image(String),
    Video(String),
}

struct BodySelectors {
    container: Selector,
    blocks: Selector,
    text_blocks: Selector,
    image: Selector,
    video: Selector,
    source: Selector,
}

impl BodySelectors {
    fn new(layout: &BodyLayout) -> Result<Self> {
        Ok(Self {
            container: parse_selector(layout.container)?,
            blocks: parse_selector(layout.blocks)?,
            text_blocks: parse_selector(layout.text_blocks)?,
            image: parse_selector("img")?,
            video: parse_selector("video")?,
            source: parse_selector("source[src]")?,
        })
    }
}

/// Block membership computed once per body.
struct BlockIndex<'a> {
    blocks: Vec<ElementRef<'a>>,
    enclosing: Vec<ElementRef<'a>>,
}

/// Where the walk currently is relative to the block structure.
#[derive(Debug, Clone, Copy)]
enum Scope {
    /// Between blocks; loose text and media here are not part of the body
    Outside,
    /// Directly inside an enclosing block
    Block { keeps_text: bool },
}

/// Walk state: output plus the direct text of the enclosing block being read.
struct BodyPlan<'a, 's> {
    selectors: &'s BodySelectors,
    index: BlockIndex<'a>,
    base: &'s Url,
    nodes: Vec<BodyNode>,
    pending_text: String,
}

impl<'a> BodyPlan<'a, '_> {
    fn flush_text(&mut self) {
        let text = self.pending_text.trim();
        if !text.is_empty() {
            self.nodes.push(BodyNode::Text(text.to_string()));
        }
        self.pending_text.clear();
    }

    fn push(&mut self, node: BodyNode) {
        self.flush_text();
        self.nodes.push(node);
    }

    /// Visit children in document order.
    fn walk(&mut self, parent: ElementRef<'a>, scope: Scope) {
        for child in parent.children() {
            if let Some(text) = child.value().as_text() {
                if let Scope::Block { keeps_text: true } = scope {
                    self.pending_text.push_str(text);
                }
                continue;
            }
            let Some(element) = ElementRef::wrap(child) else {
                continue;
            };

            if self.index.blocks.contains(&element) {
                let keeps_text = self.selectors.text_blocks.matches(&element);
                if self.index.enclosing.contains(&element) {
                    self.flush_text();
                    self.walk(element, Scope::Block { keeps_text });
                    self.flush_text();
                } else if let Some(node) = classify(&element, self.selectors, self.base, keeps_text) {
                    self.push(node);
                }
                continue;
            }

            if let Scope::Block { .. } = scope {
                if let Some(node) = inline_media(&element, self.selectors, self.base) {
                    self.push(node);
                    continue;
                }
            }
            self.walk(element, scope);
        }
    }
}

/// Classify the blocks of a body in document order.
///
/// Leaf blocks become one node each. A block containing another matching
/// block contributes its own direct text (and loose media) in position,
/// between the nodes of its nested blocks, so nested `div`/`p` markup never
/// yields the same text twice nor loses any.
pub fn plan_body(markup: &str, layout: &BodyLayout, base: &Url) -> Result<Vec<BodyNode>> {
    let selectors = BodySelectors::new(layout)?;
    let document = Html::parse_document(markup);

    let container = document
        .select(&selectors.container)
        .next()
        .ok_or_else(|| AppError::body(base.as_str(), format!("no '{}' in page", layout.container)))?;

    let blocks: Vec<ElementRef> = container.select(&selectors.blocks).collect();
    if blocks.is_empty() {
        let text = container.text().collect::<String>();
        let text = text.trim();
        return Ok(if text.is_empty() {
            Vec::new()
        } else {
            vec![BodyNode::Text(text.to_string())]
        });
    }

    let mut enclosing: Vec<ElementRef> = Vec::new();
    for block in &blocks {
        for ancestor in block.ancestors().filter_map(ElementRef::wrap) {
            if blocks.contains(&ancestor) && !enclosing.contains(&ancestor) {
                enclosing.push(ancestor);
            }
        }
    }

    let mut plan = BodyPlan {
        selectors: &selectors,
        index: BlockIndex { blocks, enclosing },
        base,
        nodes: Vec::new(),
        pending_text: String::new(),
    };
    plan.walk(container, Scope::Outside);
    plan.flush_text();
    Ok(plan.nodes)
}

fn image_source<'a>(img: &ElementRef<'a>) -> Option<&'a str> {
    IMAGE_SOURCE_ATTRS
        .iter()
        .find_map(|attr| img.value().attr(attr))
        .filter(|src| !src.trim().is_empty())
}

fn video_source<'a>(video: &ElementRef<'a>, selectors: &BodySelectors) -> Option<&'a str> {
    video
        .select(&selectors.source)
        .next()
        .and_then(|source| source.value().attr("src"))
        .or_else(|| video.value().attr("src"))
}

/// An `img` or `video` element sitting directly in an enclosing block.
fn inline_media(element: &ElementRef, selectors: &BodySelectors, base: &Url) -> Option<BodyNode> {
    match element.value().name() {
        "img" => image_source(element).map(|src| BodyNode::Image(resolve_url(base, src))),
        "video" => video_source(element, selectors).map(|src| BodyNode::Video(resolve_url(base, src))),
        _ => None,
    }
}

fn classify(
    block: &ElementRef,
    selectors: &BodySelectors,
    base: &Url,
    keeps_text: bool,
) -> Option<BodyNode> {
    if let Some(src) = block.select(&selectors.image).find_map(|img| image_source(&img)) {
        return Some(BodyNode::Image(resolve_url(base, src)));
    }

    if let Some(src) = block
        .select(&selectors.video)
        .find_map(|video| video_source(&video, selectors))
    {
        return Some(BodyNode::Video(resolve_url(base, src)));
    }

    if !keeps_text {
        return None;
    }
    let text = block.text().collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| BodyNode::Text(text.to_string()))
}

/// Turns fetched body markup into content segments, saving media on the way.
pub struct ContentNormalizer<'a> {
    media: &'a MediaStore,
    ocr: &'a dyn Ocr,
}

impl<'a> ContentNormalizer<'a> {
    pub fn new(media: &'a MediaStore, ocr: &'a dyn Ocr) -> Self {
        Self { media, ocr }
    }

    /// Normalize one post body.
    ///
    /// Media failures drop only the affected segment; a missing body
    /// container fails the whole post.
    pub async fn normalize(
        &self,
        markup: &str,
        layout: &BodyLayout,
        base: &Url,
        key: &PostKey,
        headers: &HeaderMap,
    ) -> Result<Vec<ContentSegment>> {
        let nodes = plan_body(markup, layout, base)?;
        let mut segments = Vec::with_capacity(nodes.len());

        for node in nodes {
            match node {
                BodyNode::Text(content) => segments.push(ContentSegment::Text { content }),
                BodyNode::Image(url) => {
                    match self.media.save(&url, key, None, headers.clone()).await {
                        Ok(path) => {
                            let extracted_text = self.ocr.extract(&self.media.absolute(&path)).await;
                            segments.push(ContentSegment::Image {
                                path,
                                extracted_text,
                            });
                        }
                        Err(e) => log::error!("Error processing image {} for {}: {}", url, key, e),
                    }
                }
                BodyNode::Video(url) => {
                    match self.media.save(&url, key, None, headers.clone()).await {
                        Ok(path) => segments.push(ContentSegment::Video { path }),
                        Err(e) => log::error!("Error saving video {} for {}: {}", url, key, e),
                    }
                }
            }
        }

        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Site;
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedOcr(Option<&'static str>);

    #[async_trait]
    impl Ocr for FixedOcr {
        async fn extract(&self, _image_path: &Path) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    const WRITE_DIV: BodyLayout = BodyLayout::uniform("div.write_div", "p");

    fn base() -> Url {
        Url::parse("https://gall.dcinside.com/board/view/?id=dcbest&no=1").unwrap()
    }

    #[test]
    fn plan_keeps_document_order_and_drops_blank_text() {
        let markup = r#"<div class="write_div">
            <p>A</p>
            <p><img src="//dcimg.example.com/x.png"></p>
            <p>   </p>
            <p><video><source src="/v/clip.mp4"></video></p>
            <p>B</p>
        </div>"#;

        let nodes = plan_body(markup, &WRITE_DIV, &base()).unwrap();
        assert_eq!(
            nodes,
            vec![
                BodyNode::Text("A".to_string()),
                BodyNode::Image("https://dcimg.example.com/x.png".to_string()),
                BodyNode::Video("https://gall.dcinside.com/v/clip.mp4".to_string()),
                BodyNode::Text("B".to_string()),
            ]
        );
    }

    #[test]
    fn plan_emits_leaf_blocks_only() {
        let layout = BodyLayout::uniform("div.rd_body", "p, div");
        let markup = r#"<div class="rd_body">
            <div><p>one</p><p>two</p></div>
            <div><img data-src="a.png"></div>
        </div>"#;

        let nodes = plan_body(markup, &layout, &Url::parse("https://theqoo.net/hot/9").unwrap()).unwrap();
        assert_eq!(
            nodes,
            vec![
                BodyNode::Text("one".to_string()),
                BodyNode::Text("two".to_string()),
                BodyNode::Image("https://theqoo.net/hot/a.png".to_string()),
            ]
        );
    }

    #[test]
    fn plan_keeps_direct_text_of_enclosing_blocks() {
        let layout = BodyLayout::uniform("div.rd_body", "p, div");
        let markup = r#"<div class="rd_body"><div>intro text<br><p>para</p>outro text</div></div>"#;

        let nodes = plan_body(markup, &layout, &Url::parse("https://theqoo.net/hot/9").unwrap()).unwrap();
        assert_eq!(
            nodes,
            vec![
                BodyNode::Text("intro text".to_string()),
                BodyNode::Text("para".to_string()),
                BodyNode::Text("outro text".to_string()),
            ]
        );
    }

    #[test]
    fn plan_keeps_loose_media_of_enclosing_blocks() {
        let layout = BodyLayout::uniform("div.rd_body", "p, div");
        let markup = r#"<div class="rd_body"><div><b>lead</b> in<img src="/a.png"><p>para</p></div></div>"#;

        let nodes = plan_body(markup, &layout, &Url::parse("https://theqoo.net/hot/9").unwrap()).unwrap();
        assert_eq!(
            nodes,
            vec![
                BodyNode::Text("lead in".to_string()),
                BodyNode::Image("https://theqoo.net/a.png".to_string()),
                BodyNode::Text("para".to_string()),
            ]
        );
    }

    #[test]
    fn text_blocks_limit_where_text_comes_from() {
        let layout = BodyLayout {
            container: "div.container",
            blocks: "p, div",
            text_blocks: "p",
        };
        let markup = r#"<div class="container">
            <div class="nav">Home | Login</div>
            <p>body</p>
            <div class="comment">reply spam</div>
            <div class="photo"><img src="/p/1.jpg"></div>
        </div>"#;

        let nodes = plan_body(markup, &layout, &Url::parse("https://ygosu.com/board/free/1/").unwrap()).unwrap();
        assert_eq!(
            nodes,
            vec![
                BodyNode::Text("body".to_string()),
                BodyNode::Image("https://ygosu.com/p/1.jpg".to_string()),
            ]
        );
    }

    #[test]
    fn plan_without_blocks_uses_container_text() {
        let markup = r#"<div class="write_div"> just text </div>"#;
        let nodes = plan_body(markup, &WRITE_DIV, &base()).unwrap();
        assert_eq!(nodes, vec![BodyNode::Text("just text".to_string())]);
    }

    #[test]
    fn plan_fails_without_container() {
        let err = plan_body("<div>nothing</div>", &WRITE_DIV, &base()).unwrap_err();
        assert!(matches!(err, AppError::BodyFetch { .. }));
    }

    #[tokio::test]
    async fn normalize_text_image_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/x.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"pixels".to_vec()))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let media = MediaStore::new(reqwest::Client::new(), tmp.path());
        let ocr = FixedOcr(Some("ocr text"));
        let normalizer = ContentNormalizer::new(&media, &ocr);

        let markup = format!(
            r#"<div class="write_div"><p>A</p><p><img src="{}/img/x.png"></p><p>B</p></div>"#,
            server.uri()
        );
        let key = PostKey::new(Site::Dcinside, "dcbest", 1);
        let segments = normalizer
            .normalize(&markup, &WRITE_DIV, &base(), &key, &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(
            segments,
            vec![
                ContentSegment::text("A"),
                ContentSegment::Image {
                    path: "dcinside/dcbest/1/x.png".to_string(),
                    extracted_text: Some("ocr text".to_string()),
                },
                ContentSegment::text("B"),
            ]
        );
    }

    #[tokio::test]
    async fn failed_download_drops_only_that_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/x.png"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let media = MediaStore::new(reqwest::Client::new(), tmp.path());
        let ocr = FixedOcr(Some("unused"));
        let normalizer = ContentNormalizer::new(&media, &ocr);

        let markup = format!(
            r#"<div class="write_div"><p>A</p><p><img src="{}/img/x.png"></p><p>B</p></div>"#,
            server.uri()
        );
        let key = PostKey::new(Site::Dcinside, "dcbest", 1);
        let segments = normalizer
            .normalize(&markup, &WRITE_DIV, &base(), &key, &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(segments, vec![ContentSegment::text("A"), ContentSegment::text("B")]);
    }

    #[tokio::test]
    async fn failed_ocr_keeps_image_with_null_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/x.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"pixels".to_vec()))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let media = MediaStore::new(reqwest::Client::new(), tmp.path());
        let ocr = FixedOcr(None);
        let normalizer = ContentNormalizer::new(&media, &ocr);

        let markup = format!(
            r#"<div class="write_div"><p><img src="{}/img/x.png"></p></div>"#,
            server.uri()
        );
        let key = PostKey::new(Site::Dcinside, "dcbest", 1);
        let segments = normalizer
            .normalize(&markup, &WRITE_DIV, &base(), &key, &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(
            segments,
            vec![ContentSegment::Image {
                path: "dcinside/dcbest/1/x.png".to_string(),
                extracted_text: None,
            }]
        );
    }
}

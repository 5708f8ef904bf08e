//! GROQ queries.

/// Projection shared by the post queries.
const POST_FIELDS: &str = r#"{
  _id,
  title,
  metadata,
  slug,
  tags,
  language,
  gameVersion,
  author->{ _id, name, slug, image, bio },
  mainImage{ asset->{ _id, url } },
  publishedAt,
  body
}"#;

const PRODUCT_FIELDS: &str = r#"{
  _id,
  name,
  category,
  body,
  alt,
  gameVersion,
  league,
  difficulty,
  updatedAt,
  "slug": slug.current
}"#;

pub fn posts() -> String {
    format!(r#"*[_type == "post" && language == $language] | order(publishedAt desc) {POST_FIELDS}"#)
}

pub fn post_by_slug() -> String {
    format!(r#"*[_type == "post" && slug.current == $slug && language == $language][0] {POST_FIELDS}"#)
}

pub fn posts_by_category_and_game() -> String {
    format!(
        r#"*[_type == "post" && category->slug.current == $categorySlug && category->language == $language && gameVersion == $gameVersion && language == $language] | order(publishedAt desc) {POST_FIELDS}"#
    )
}

pub const RELATED_POSTS: &str = r#"*[_type == "post" && slug.current != $currentPostSlug && language == $language] | order(publishedAt desc)[0...$limit] {
  _id,
  title,
  slug,
  publishedAt,
  metadata,
  author->{ name }
}"#;

pub fn products() -> String {
    format!(r#"*[_type == "product"] {PRODUCT_FIELDS}"#)
}

pub fn product_by_slug() -> String {
    format!(r#"*[_type == "product" && slug.current == $slug][0] {PRODUCT_FIELDS}"#)
}

/// Slugs and last-modified dates for the sitemap.
pub const SITEMAP_POSTS: &str = r#"*[_type == "post" && defined(slug.current)] {
  "slug": slug.current,
  "updatedAt": coalesce(publishedAt, _updatedAt)
}"#;

use serde::Serialize;

use crate::content::summary::{body_excerpt, body_read_time, format_timestamp, read_time_label, CARD_EXCERPT_CHARS};
use crate::content::PostBody;
use crate::models::Post;

pub const ALL_CATEGORIES: &str = "All";
pub const HOME_RECENT: usize = 8;
pub const COMPACT_CARDS: usize = 3;

/// One post as shown on a listing card.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PostCard {
    pub id: String,
    pub title: String,
    pub category: String,
    pub excerpt: String,
    pub read_time: String,
    pub date: String,
    pub image: Option<String>,
    pub author: String,
    pub likes: u64,
    pub views: u64,
}

impl PostCard {
    pub fn from_post(post: &Post) -> Self {
        Self {
            id: post.id.clone(),
            title: post.title.clone(),
            category: post.category.clone(),
            excerpt: body_excerpt(&post.content, CARD_EXCERPT_CHARS),
            read_time: read_time_label(body_read_time(&post.content)),
            date: post.created_at.as_ref().map(format_timestamp).unwrap_or_default(),
            image: post.featured_image.clone(),
            author: post
                .author
                .as_ref()
                .and_then(|a| a.username())
                .unwrap_or("Unknown")
                .to_string(),
            likes: post.tally().likes,
            views: post.views,
        }
    }
}

/// Title or body text contains `term`, ignoring case. An empty term matches.
pub fn matches_search(post: &Post, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    if post.title.to_lowercase().contains(&term) {
        return true;
    }
    match &post.content {
        PostBody::Document(doc) => doc.texts().collect::<Vec<_>>().join(" ").to_lowercase().contains(&term),
        _ => false,
    }
}

/// "All" followed by each distinct category in first-seen order.
pub fn categories(posts: &[Post]) -> Vec<String> {
    let mut out = vec![ALL_CATEGORIES.to_string()];
    for post in posts {
        if !post.category.is_empty() && !out.contains(&post.category) {
            out.push(post.category.clone());
        }
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub query: String,
    pub category: Option<String>,
}

impl ListingFilter {
    pub fn new(query: Option<String>, category: Option<String>) -> Self {
        Self {
            query: query.unwrap_or_default(),
            category: category.filter(|c| !c.is_empty() && c != ALL_CATEGORIES),
        }
    }

    pub fn admits(&self, post: &Post) -> bool {
        let category_ok = self.category.as_deref().map_or(true, |c| post.category == c);
        category_ok && matches_search(post, &self.query)
    }

    pub fn selected_category(&self) -> &str {
        self.category.as_deref().unwrap_or(ALL_CATEGORIES)
    }
}

#[derive(Debug, Serialize)]
pub struct HomeView {
    pub featured: Option<PostCard>,
    pub recent: Vec<PostCard>,
}

impl HomeView {
    pub fn build(posts: &[Post]) -> Self {
        let mut cards = posts.iter().take(HOME_RECENT + 1).map(PostCard::from_post);
        let featured = cards.next();
        Self { featured, recent: cards.collect() }
    }
}

#[derive(Debug, Serialize)]
pub struct BlogListing {
    pub compact: Vec<PostCard>,
    pub cards: Vec<PostCard>,
    pub categories: Vec<String>,
    pub selected_category: String,
    pub query: String,
    pub total: usize,
}

impl BlogListing {
    pub fn build(posts: &[Post], filter: &ListingFilter) -> Self {
        let cards: Vec<PostCard> = posts
            .iter()
            .filter(|p| filter.admits(p))
            .map(PostCard::from_post)
            .collect();
        Self {
            compact: cards.iter().take(COMPACT_CARDS).cloned().collect(),
            total: cards.len(),
            cards,
            categories: categories(posts),
            selected_category: filter.selected_category().to_string(),
            query: filter.query.clone(),
        }
    }
}

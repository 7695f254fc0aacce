//! Pure projections over fetched records: sorting, pagination, and the
//! summaries shown on the landing page and the admin analytics page.
//!
//! Nothing here touches the cache or the network.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use scholarstream_core::{Application, Review, Role, Scholarship, UserRecord};

/// Number of cards in each landing-page section.
pub const FEATURED_COUNT: usize = 6;

/// Number of universities in the analytics chart.
pub const TOP_UNIVERSITY_COUNT: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeeOrder {
    LowToHigh,
    HighToLow,
}

/// Parse a fee such as `"$1,250.00"`. Everything except digits, `.` and `-`
/// is ignored. `None` when nothing numeric remains.
pub fn parse_fee(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Stable sort by fee. Unparsable or missing fees go last in both orders.
pub fn sort_by_fee<T, F>(items: &[T], order: FeeOrder, fee: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> Option<&str>,
{
    let mut keyed: Vec<(Option<f64>, &T)> = items
        .iter()
        .map(|item| (fee(item).and_then(parse_fee), item))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => match order {
            FeeOrder::LowToHigh => a.total_cmp(b),
            FeeOrder::HighToLow => b.total_cmp(a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    keyed.into_iter().map(|(_, item)| item.clone()).collect()
}

/// One page of a list.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, clamped to `1..=total_pages` (or 1 for an empty list).
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page);
    let page = page.clamp(1, total_pages.max(1));
    let start = (page - 1) * per_page;
    Page {
        items: items.iter().skip(start).take(per_page).cloned().collect(),
        page,
        total_pages,
        total,
    }
}

/// Countries for the catalog filter, sorted, without duplicates or blanks.
pub fn unique_countries(scholarships: &[Scholarship]) -> Vec<String> {
    scholarships
        .iter()
        .filter_map(|s| s.country.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Most recent first; records without a timestamp last.
fn newest_first(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Cheapest application fee first, ties broken by most recent posting.
pub fn featured_scholarships(scholarships: &[Scholarship]) -> Vec<Scholarship> {
    let mut sorted = scholarships.to_vec();
    sorted.sort_by(|a, b| {
        let fa = a.application_fee.as_deref().and_then(parse_fee).unwrap_or(f64::INFINITY);
        let fb = b.application_fee.as_deref().and_then(parse_fee).unwrap_or(f64::INFINITY);
        fa.total_cmp(&fb)
            .then_with(|| newest_first(a.created_at.as_deref(), b.created_at.as_deref()))
    });
    sorted.truncate(FEATURED_COUNT);
    sorted
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniversityRank {
    pub university_name: String,
    pub country: Option<String>,
    pub image: Option<String>,
    pub world_rank: u32,
}

fn parse_rank(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .trim_start_matches('#')
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Best-ranked universities, one entry per university.
pub fn top_universities(scholarships: &[Scholarship]) -> Vec<UniversityRank> {
    let mut best: HashMap<&str, UniversityRank> = HashMap::new();
    for s in scholarships {
        let Some(rank) = s.world_rank.as_deref().and_then(parse_rank) else {
            continue;
        };
        if s.university_name.is_empty() {
            continue;
        }
        let better = best
            .get(s.university_name.as_str())
            .map_or(true, |existing| rank < existing.world_rank);
        if better {
            best.insert(
                s.university_name.as_str(),
                UniversityRank {
                    university_name: s.university_name.clone(),
                    country: s.country.clone(),
                    image: s.image.clone(),
                    world_rank: rank,
                },
            );
        }
    }
    let mut ranked: Vec<UniversityRank> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        a.world_rank
            .cmp(&b.world_rank)
            .then_with(|| a.university_name.cmp(&b.university_name))
    });
    ranked.truncate(FEATURED_COUNT);
    ranked
}

/// Reviews worth showing as testimonials: highest rating first, then newest.
pub fn featured_reviews(reviews: &[Review]) -> Vec<Review> {
    let mut shown: Vec<Review> = reviews
        .iter()
        .filter(|r| {
            r.rating_point.is_some_and(|p| p > 0)
                && r.review_comment.as_deref().is_some_and(|c| !c.trim().is_empty())
        })
        .cloned()
        .collect();
    shown.sort_by(|a, b| {
        b.rating_point
            .cmp(&a.rating_point)
            .then_with(|| newest_first(a.created_at.as_deref(), b.created_at.as_deref()))
    });
    shown.truncate(FEATURED_COUNT);
    shown
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlatformStats {
    pub scholarships: usize,
    pub applications: usize,
    pub universities: usize,
    pub countries: usize,
}

pub fn platform_stats(scholarships: &[Scholarship], applications: &[Application]) -> PlatformStats {
    let universities: BTreeSet<&str> = scholarships
        .iter()
        .map(|s| s.university_name.as_str())
        .filter(|u| !u.is_empty())
        .collect();
    PlatformStats {
        scholarships: scholarships.len(),
        applications: applications.len(),
        universities: universities.len(),
        countries: unique_countries(scholarships).len(),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalyticsSummary {
    pub total_users: usize,
    pub total_scholarships: usize,
    pub fees_collected: f64,
    /// Applications per university, most applied first, at most ten.
    pub per_university: Vec<(String, usize)>,
    /// Applications per scholarship category, in order of first appearance.
    pub per_category: Vec<(String, usize)>,
}

impl AnalyticsSummary {
    /// Fees collected with two decimals, as displayed.
    pub fn fees_collected_display(&self) -> String {
        format!("{:.2}", self.fees_collected)
    }
}

fn count_by<'a>(names: impl Iterator<Item = Option<&'a str>>) -> Vec<(String, usize)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for name in names {
        let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("Unknown");
        match index.get(name) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(name.to_string(), counts.len());
                counts.push((name.to_string(), 1));
            }
        }
    }
    counts
}

pub fn analytics_summary(
    users: &[UserRecord],
    scholarships: &[Scholarship],
    applications: &[Application],
) -> AnalyticsSummary {
    let fees_collected = applications
        .iter()
        .filter(|a| a.is_paid())
        .filter_map(|a| a.application_fee.as_deref().and_then(parse_fee))
        .sum();

    let mut per_university = count_by(
        applications
            .iter()
            .map(|a| Some(a.university_name.as_str())),
    );
    per_university.sort_by(|a, b| b.1.cmp(&a.1));
    per_university.truncate(TOP_UNIVERSITY_COUNT);

    AnalyticsSummary {
        total_users: users.len(),
        total_scholarships: scholarships.len(),
        fees_collected,
        per_university,
        per_category: count_by(applications.iter().map(|a| a.scholarship_category.as_deref())),
    }
}

/// Users with exactly `role`; `None` keeps everyone. Records without a role
/// count as students, the default for new accounts.
pub fn filter_users_by_role(users: &[UserRecord], role: Option<Role>) -> Vec<UserRecord> {
    match role {
        None => users.to_vec(),
        Some(role) => users
            .iter()
            .filter(|u| match u.role.as_deref() {
                None | Some("") => role == Role::Student,
                Some(_) => u.role() == Some(role),
            })
            .cloned()
            .collect(),
    }
}

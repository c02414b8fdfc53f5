use sqlx::{Postgres, QueryBuilder};

use crate::domain::location::LocationFilter;
use crate::domain::post::placeholder_like_patterns;

/// Narrows a query over `user_content c` to the posts a location filter selects.
///
/// `None` leaves the query untouched.
pub fn push_location_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: Option<&LocationFilter>) {
    let Some(filter) = filter else {
        return;
    };

    match filter {
        LocationFilter::SeattleAll => {
            qb.push(" AND c.is_in_seattle = TRUE");
        }
        LocationFilter::Outside => {
            qb.push(" AND c.is_in_seattle = FALSE");
        }
        LocationFilter::SeattleNeighborhood(label) => {
            qb.push(" AND c.is_in_seattle = TRUE AND LOWER(c.location) = LOWER(");
            qb.push_bind(label.clone());
            qb.push(")");
        }
        LocationFilter::Exact(label) => {
            qb.push(" AND LOWER(c.location) = LOWER(");
            qb.push_bind(label.clone());
            qb.push(")");
        }
    }
}

/// Drops posts without a thumbnail or with a placeholder one.
pub fn push_thumbnail_filter(qb: &mut QueryBuilder<'_, Postgres>) {
    qb.push(" AND c.thumbnail IS NOT NULL AND BTRIM(c.thumbnail) <> ''");
    qb.push(" AND NOT (LOWER(BTRIM(c.thumbnail)) LIKE ANY(");
    qb.push_bind(placeholder_like_patterns());
    qb.push("))");
}

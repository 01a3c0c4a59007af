//! Derived queries: finder predicates compiled into filter/sort expressions.
//!
//! A finder such as `find_by_username_and_age_greater_than` is declared as a
//! `DerivedQuery` with one `Criterion` per name segment. Nothing is parsed at
//! runtime; the structure is written out where the finder is defined.

use sea_orm::sea_query::SimpleExpr;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select, Value};

use common::{AppError, AppResult};
use domain::{Direction, Sort};

use super::entities::{member, team};

/// Maps domain property names to entity columns for sorting.
pub trait PropertyColumns: EntityTrait {
    /// Domain type name used in error messages
    const TYPE_NAME: &'static str;

    fn column_for(property: &str) -> Option<Self::Column>;

    /// Column used to order otherwise unsorted results
    fn identity_column() -> Self::Column;

    /// Resolve a property or fail like an unknown property reference
    fn resolve(property: &str) -> AppResult<Self::Column> {
        Self::column_for(property).ok_or_else(|| {
            AppError::invalid_query(format!(
                "No property '{}' found for type {}",
                property,
                Self::TYPE_NAME
            ))
        })
    }
}

impl PropertyColumns for member::Entity {
    const TYPE_NAME: &'static str = "Member";

    fn column_for(property: &str) -> Option<member::Column> {
        match property {
            "id" => Some(member::Column::Id),
            "username" => Some(member::Column::Username),
            "age" => Some(member::Column::Age),
            "team" | "team.id" | "teamId" => Some(member::Column::TeamId),
            "createdAt" | "created_at" => Some(member::Column::CreatedAt),
            "updatedAt" | "updated_at" => Some(member::Column::UpdatedAt),
            _ => None,
        }
    }

    fn identity_column() -> member::Column {
        member::Column::Id
    }
}

impl PropertyColumns for team::Entity {
    const TYPE_NAME: &'static str = "Team";

    fn column_for(property: &str) -> Option<team::Column> {
        match property {
            "id" => Some(team::Column::Id),
            "name" => Some(team::Column::Name),
            "createdAt" | "created_at" => Some(team::Column::CreatedAt),
            "updatedAt" | "updated_at" => Some(team::Column::UpdatedAt),
            _ => None,
        }
    }

    fn identity_column() -> team::Column {
        team::Column::Id
    }
}

/// One predicate segment of a finder name
#[derive(Debug, Clone)]
pub enum Criterion<C> {
    Equals(C, Value),
    GreaterThan(C, Value),
    GreaterThanEqual(C, Value),
    LessThan(C, Value),
    LessThanEqual(C, Value),
    In(C, Vec<Value>),
    IsNull(C),
    IsNotNull(C),
}

impl<C: ColumnTrait> Criterion<C> {
    pub fn equals(column: C, value: impl Into<Value>) -> Self {
        Criterion::Equals(column, value.into())
    }

    pub fn greater_than(column: C, value: impl Into<Value>) -> Self {
        Criterion::GreaterThan(column, value.into())
    }

    pub fn greater_than_equal(column: C, value: impl Into<Value>) -> Self {
        Criterion::GreaterThanEqual(column, value.into())
    }

    pub fn less_than(column: C, value: impl Into<Value>) -> Self {
        Criterion::LessThan(column, value.into())
    }

    pub fn less_than_equal(column: C, value: impl Into<Value>) -> Self {
        Criterion::LessThanEqual(column, value.into())
    }

    pub fn is_in<V: Into<Value>>(column: C, values: impl IntoIterator<Item = V>) -> Self {
        Criterion::In(column, values.into_iter().map(Into::into).collect())
    }

    fn to_expr(&self) -> SimpleExpr {
        match self {
            Criterion::Equals(c, v) => c.eq(v.clone()),
            Criterion::GreaterThan(c, v) => c.gt(v.clone()),
            Criterion::GreaterThanEqual(c, v) => c.gte(v.clone()),
            Criterion::LessThan(c, v) => c.lt(v.clone()),
            Criterion::LessThanEqual(c, v) => c.lte(v.clone()),
            Criterion::In(c, values) => c.is_in(values.clone()),
            Criterion::IsNull(c) => c.is_null(),
            Criterion::IsNotNull(c) => c.is_not_null(),
        }
    }
}

/// Conjunction of criteria plus sort and row limit
#[derive(Debug, Clone)]
pub struct DerivedQuery<E: EntityTrait> {
    criteria: Vec<Criterion<E::Column>>,
    sort: Sort,
    limit: Option<u64>,
}

impl<E: PropertyColumns> DerivedQuery<E> {
    /// Query without predicate (`findBy`, `findAll`)
    pub fn all() -> Self {
        Self {
            criteria: Vec::new(),
            sort: Sort::unsorted(),
            limit: None,
        }
    }

    /// Add an `And` segment
    pub fn and(mut self, criterion: Criterion<E::Column>) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// `OrderBy` segment or a runtime `Sort` argument
    pub fn order_by(mut self, sort: Sort) -> Self {
        self.sort = self.sort.and(sort);
        self
    }

    /// `TopN` / `FirstN` prefix
    pub fn first(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Predicate only, for count queries
    pub fn condition(&self) -> Condition {
        self.criteria
            .iter()
            .fold(Condition::all(), |cond, criterion| cond.add(criterion.to_expr()))
    }

    /// Compile into a select; unsorted queries fall back to primary key order
    pub fn select(&self) -> AppResult<Select<E>> {
        let mut select = E::find().filter(self.condition());
        select = apply_sort::<E>(select, &self.sort)?;
        if let Some(limit) = self.limit {
            select = select.limit(limit);
        }
        Ok(select)
    }
}

/// Apply a sort descriptor to a select; unsorted selects are ordered by id
pub fn apply_sort<E: PropertyColumns>(mut select: Select<E>, sort: &Sort) -> AppResult<Select<E>> {
    if !sort.is_sorted() {
        return Ok(select.order_by_asc(E::identity_column()));
    }
    for order in &sort.orders {
        let column = E::resolve(&order.property)?;
        select = match order.direction {
            Direction::Asc => select.order_by_asc(column),
            Direction::Desc => select.order_by_desc(column),
        };
    }
    Ok(select)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn sql(query: &DerivedQuery<member::Entity>) -> String {
        query
            .select()
            .expect("query should compile")
            .build(DbBackend::Sqlite)
            .to_string()
    }

    #[test]
    fn username_and_age_greater_than_compiles_to_conjunction() {
        let query = DerivedQuery::<member::Entity>::all()
            .and(Criterion::equals(member::Column::Username, "AAA"))
            .and(Criterion::greater_than(member::Column::Age, 15));
        let sql = sql(&query);

        assert!(sql.contains(r#""member"."username" = 'AAA'"#), "{sql}");
        assert!(sql.contains(r#""member"."age" > 15"#), "{sql}");
        assert!(sql.contains(" AND "), "{sql}");
    }

    #[test]
    fn top_three_applies_limit() {
        let query = DerivedQuery::<member::Entity>::all().first(3);
        assert!(sql(&query).contains("LIMIT 3"));
    }

    #[test]
    fn sort_orders_are_applied_in_sequence() {
        let query = DerivedQuery::<member::Entity>::all()
            .order_by(Sort::by(Direction::Desc, &["username"]))
            .order_by(Sort::by(Direction::Asc, &["age"]));
        let sql = sql(&query);

        let username = sql.find(r#""member"."username" DESC"#).expect("username order");
        let age = sql.find(r#""member"."age" ASC"#).expect("age order");
        assert!(username < age);
    }

    #[test]
    fn unknown_sort_property_is_rejected() {
        let query = DerivedQuery::<member::Entity>::all()
            .order_by(Sort::by(Direction::Asc, &["nickname"]));
        let err = query.select().unwrap_err();
        assert!(err.to_string().contains("No property 'nickname' found for type Member"));
    }

    #[test]
    fn in_criterion_lists_every_value() {
        let query = DerivedQuery::<member::Entity>::all()
            .and(Criterion::is_in(member::Column::Username, ["AAA", "BBB"]));
        assert!(sql(&query).contains(r#""member"."username" IN ('AAA', 'BBB')"#));
    }

    #[test]
    fn team_properties_resolve() {
        assert!(team::Entity::resolve("name").is_ok());
        assert!(team::Entity::resolve("username").is_err());
    }
}

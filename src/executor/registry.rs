use crate::error::DbError;
use crate::mapper_loader::{self, MapperSet, StatementKind};
use crate::tpl::SqlTemplate;
use crate::udbc::connection::Connection;
use tracing::{debug, info};

pub const ALL_STATES: &str = "allStates";
pub const CITIES_IN_STATE: &str = "citiesInState";
pub const ZIPS_IN_CITY: &str = "zipsInCity";
pub const BUSINESSES_IN_ZIP: &str = "businessesInZip";
pub const BUSINESSES_IN_ZIP_WITH_CATEGORIES: &str = "businessesInZipWithCategories";
pub const INSERT_TIP: &str = "insertTip";
pub const TIPS_FOR_BUSINESS: &str = "tipsForBusiness";

/// Every statement id the registry prepares, in preparation order.
pub const STATEMENT_IDS: [&str; 7] = [
    ALL_STATES,
    CITIES_IN_STATE,
    ZIPS_IN_CITY,
    BUSINESSES_IN_ZIP,
    BUSINESSES_IN_ZIP_WITH_CATEGORIES,
    INSERT_TIP,
    TIPS_FOR_BUSINESS,
];

/// A compiled template together with the driver's prepared handle for it.
#[derive(Debug, Clone)]
pub struct Statement<S> {
    pub template: SqlTemplate,
    pub kind: StatementKind,
    pub handle: S,
}

impl<S> Statement<S> {
    pub fn id(&self) -> &str {
        &self.template.id
    }
}

/// The fixed set of statements the accessors run, prepared once per connection.
#[derive(Debug)]
pub struct StatementRegistry<S> {
    pub all_states: Statement<S>,
    pub cities_in_state: Statement<S>,
    pub zips_in_city: Statement<S>,
    pub businesses_in_zip: Statement<S>,
    pub businesses_in_zip_with_categories: Statement<S>,
    pub insert_tip: Statement<S>,
    pub tips_for_business: Statement<S>,
}

impl<S> StatementRegistry<S> {
    /// Prepares every statement of the embedded listings mapper on `conn`.
    pub async fn prepare<C>(conn: &C) -> Result<Self, DbError>
    where
        C: Connection<Statement = S>,
    {
        let mappers = mapper_loader::load(mapper_loader::LISTINGS_MAPPER)
            .map_err(|e| DbError::prepare("listings", format!("{:#}", e)))?;
        Self::prepare_from(conn, &mappers).await
    }

    /// Prepares the registry from an already loaded mapper set.
    ///
    /// Fails on the first statement that is missing, does not compile, or is
    /// rejected by the server.
    pub async fn prepare_from<C>(conn: &C, mappers: &MapperSet) -> Result<Self, DbError>
    where
        C: Connection<Statement = S>,
    {
        let registry = Self {
            all_states: prepare_one(conn, mappers, ALL_STATES).await?,
            cities_in_state: prepare_one(conn, mappers, CITIES_IN_STATE).await?,
            zips_in_city: prepare_one(conn, mappers, ZIPS_IN_CITY).await?,
            businesses_in_zip: prepare_one(conn, mappers, BUSINESSES_IN_ZIP).await?,
            businesses_in_zip_with_categories: prepare_one(
                conn,
                mappers,
                BUSINESSES_IN_ZIP_WITH_CATEGORIES,
            )
            .await?,
            insert_tip: prepare_one(conn, mappers, INSERT_TIP).await?,
            tips_for_business: prepare_one(conn, mappers, TIPS_FOR_BUSINESS).await?,
        };
        info!(namespace = %mappers.namespace, statements = STATEMENT_IDS.len(), "statements prepared");
        Ok(registry)
    }
}

async fn prepare_one<C: Connection>(
    conn: &C,
    mappers: &MapperSet,
    id: &str,
) -> Result<Statement<C::Statement>, DbError> {
    let mapper = mappers
        .get(id)
        .ok_or_else(|| DbError::prepare(id, "statement not declared in mapper"))?;
    let template = SqlTemplate::compile(id, &mapper.content)?;
    let handle = conn
        .prepare(&template.sql, &template.types())
        .await
        .map_err(|e| DbError::prepare(id, e))?;
    debug!(id, sql = %template.sql, params = template.params.len(), "prepared");
    Ok(Statement {
        template,
        kind: mapper.kind,
        handle,
    })
}

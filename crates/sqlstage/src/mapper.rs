//! The produced surface: schema, insert, update and hydration for mapped types.

use sqlstage_core::{
    Cursor, Datum, Entity, Error, FieldAccessError, FieldDescriptor, Mapped, QueryExecutor,
    Result, SqlType, TypeRef, introspect,
};
use sqlstage_schema::{ForeignKey, ForeignKeyObject};

use crate::config::MapperConfig;
use crate::execute::run_updates;
use crate::reflector::RepositoryClass;
use crate::registry::StageRegistry;
use crate::stage::{
    EmbeddedStage, HydrationPass, MappingContext, ScalarStage, SchemaPass, Stage, WriteMode,
    WritePass,
};

/// Entry point for mapping passes.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, Default, Mapped)]
/// #[stage(table = "users")]
/// struct User {
///     #[stage(primary_key)]
///     id: i64,
///     tags: Vec<String>,
/// }
///
/// let mapper = Mapper::new();
/// let ddl = mapper.generate_schema::<User>()?;
/// // CREATE TABLE IF NOT EXISTS users (id BIGINT NOT NULL, PRIMARY KEY (id));
/// // CREATE TABLE IF NOT EXISTS users_tags (users_id BIGINT NOT NULL, tags_value TEXT,
/// //     FOREIGN KEY (users_id) REFERENCES users (id) ON DELETE CASCADE);
/// ```
#[derive(Debug, Clone)]
pub struct Mapper<'r> {
    registry: &'r StageRegistry,
    config: MapperConfig,
}

impl Default for Mapper<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapper<'static> {
    /// Mapper over the process-wide registry with default configuration.
    pub fn new() -> Self {
        Self::with_registry(StageRegistry::global())
    }
}

impl<'r> Mapper<'r> {
    /// Mapper over an explicit registry.
    pub fn with_registry(registry: &'r StageRegistry) -> Self {
        Self {
            registry,
            config: MapperConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    pub fn mapper_config(&self) -> &MapperConfig {
        &self.config
    }

    /// The registry stages are resolved from.
    pub fn registry(&self) -> &'r StageRegistry {
        self.registry
    }

    fn context(&self) -> MappingContext<'_> {
        MappingContext::new(self.registry, &self.config)
    }

    /// The root type must resolve to the embedded stage.
    fn root_class(ctx: &MappingContext<'_>, ty: &TypeRef) -> Result<RepositoryClass> {
        match ctx.resolve(ty)? {
            Stage::Embedded(_) => RepositoryClass::of(ty),
            _ => Err(Error::stage_not_supported(ty.name(), "root record")),
        }
    }

    fn key_stage(ctx: &MappingContext<'_>, field: &FieldDescriptor) -> Result<ScalarStage> {
        match ctx.resolve(&field.ty)? {
            Stage::Scalar(stage) => Ok(*stage),
            _ => Err(Error::stage_not_supported(field.ty.name(), "primary key")),
        }
    }

    fn key_type(ctx: &MappingContext<'_>, field: &FieldDescriptor) -> Result<SqlType> {
        let stage = Self::key_stage(ctx, field)?;
        Ok(stage.column_def(field.row_name(), &field.ty)?.sql_type)
    }

    fn schema_keys(ctx: &MappingContext<'_>, class: &RepositoryClass) -> Result<Vec<ForeignKey>> {
        let table = class.table_name();
        class
            .primary_keys()
            .map(|field| -> Result<ForeignKey> {
                Ok(ForeignKey::new(
                    table,
                    field.row_name(),
                    Self::key_type(ctx, field)?,
                ))
            })
            .collect()
    }

    fn schema_pass(ctx: &MappingContext<'_>, class: &RepositoryClass) -> Result<SchemaPass> {
        let mut pass = SchemaPass::new(class.table_name(), Self::schema_keys(ctx, class)?);
        EmbeddedStage.collect_schema(ctx, class, None, &mut pass)?;
        Ok(pass)
    }

    /// `CREATE TABLE` statements for `T`: the root table first, then child tables in
    /// field order.
    pub fn generate_schema<T: Mapped>(&self) -> Result<Vec<String>> {
        self.generate_schema_for(&T::type_ref())
    }

    /// [`generate_schema`](Self::generate_schema) for a runtime type key.
    #[tracing::instrument(level = "debug", skip(self, ty), fields(type_name = ty.name()))]
    pub fn generate_schema_for(&self, ty: &TypeRef) -> Result<Vec<String>> {
        tracing::debug!("Generating schema");
        let ctx = self.context();
        let class = Self::root_class(&ctx, ty)?;
        let table = class.table_name();
        let mut pass = Self::schema_pass(&ctx, &class)?;
        if pass.keys.is_empty() && !pass.statements.is_empty() {
            tracing::warn!(
                table = %table,
                children = pass.statements.len(),
                "Root has no primary key; child rows will not be correlated"
            );
        }

        let mut statements = Vec::with_capacity(pass.statements.len() + 1);
        statements.push(ctx.builder().create_table(table, &pass.columns, &[]));
        statements.append(&mut pass.statements);
        for sql in &statements {
            tracing::trace!(sql = %sql, "Generated schema statement");
        }
        Ok(statements)
    }

    /// `INSERT` statements for one instance: the root row first, then one row per
    /// collection element.
    pub fn generate_insert<T: Mapped>(&self, instance: &T) -> Result<Vec<String>> {
        self.generate_insert_for(instance)
    }

    /// [`generate_insert`](Self::generate_insert) for a type-erased instance.
    pub fn generate_insert_for(&self, instance: &dyn Entity) -> Result<Vec<String>> {
        self.generate_write(instance, WriteMode::Insert)
    }

    /// `UPDATE` of the root row keyed by its primary key.
    ///
    /// Collection fields follow the configured
    /// [`CollectionUpdatePolicy`](crate::CollectionUpdatePolicy).
    pub fn generate_update<T: Mapped>(&self, instance: &T) -> Result<Vec<String>> {
        self.generate_update_for(instance)
    }

    /// [`generate_update`](Self::generate_update) for a type-erased instance.
    pub fn generate_update_for(&self, instance: &dyn Entity) -> Result<Vec<String>> {
        self.generate_write(instance, WriteMode::Update)
    }

    #[tracing::instrument(level = "debug", skip(self, instance), fields(type_name = instance.entity_type().name()))]
    fn generate_write(&self, instance: &dyn Entity, mode: WriteMode) -> Result<Vec<String>> {
        tracing::debug!(mode = ?mode, "Generating data statements");
        let ctx = self.context();
        let ty = instance.entity_type();
        let class = Self::root_class(&ctx, &ty)?;
        let table = class.table_name();

        let keys = class
            .primary_keys()
            .map(|field| -> Result<ForeignKeyObject> {
                let stage = Self::key_stage(&ctx, field)?;
                let value = stage.serialize(&field.ty, introspect::read(instance, field)?)?;
                Ok(ForeignKeyObject::new(table, field.row_name(), value))
            })
            .collect::<Result<Vec<_>>>()?;

        if mode == WriteMode::Update && keys.is_empty() {
            return Err(Error::MissingPrimaryKey {
                type_name: ty.name(),
            });
        }

        let mut pass = WritePass::new(ty.name(), mode, table, keys);
        EmbeddedStage.collect_write(&ctx, &class, None, Some(instance), &mut pass)?;

        let mut statements = Vec::with_capacity(pass.statements.len() + 1);
        match mode {
            WriteMode::Insert => {
                statements.push(ctx.builder().insert(table, &pass.values));
            }
            WriteMode::Update => {
                let filter: Vec<_> = pass
                    .keys
                    .iter()
                    .map(|key| (key.column.clone(), key.value.clone()))
                    .collect();
                let set: Vec<_> = pass
                    .values
                    .iter()
                    .filter(|(column, _)| !pass.keys.iter().any(|key| key.column == *column))
                    .cloned()
                    .collect();
                if !set.is_empty() {
                    statements.push(ctx.builder().update(table, &set, &filter));
                }
            }
        }
        statements.append(&mut pass.statements);
        for sql in &statements {
            tracing::trace!(sql = %sql, "Generated data statement");
        }
        Ok(statements)
    }

    /// Rebuild a `T` from the cursor's current row. Collection fields query their child
    /// tables through `executor`.
    pub fn hydrate<T: Mapped>(&self, executor: &dyn QueryExecutor, cursor: &dyn Cursor) -> Result<T> {
        Datum::Object(self.hydrate_for(&T::type_ref(), executor, cursor)?).into_record()
    }

    /// [`hydrate`](Self::hydrate) for a runtime type key.
    #[tracing::instrument(level = "debug", skip(self, ty, executor, cursor), fields(type_name = ty.name()))]
    pub fn hydrate_for(
        &self,
        ty: &TypeRef,
        executor: &dyn QueryExecutor,
        cursor: &dyn Cursor,
    ) -> Result<Box<dyn Entity>> {
        let ctx = self.context();
        let class = Self::root_class(&ctx, ty)?;
        Self::schema_pass(&ctx, &class)?;
        Self::hydrate_row(&ctx, &class, executor, cursor)
    }

    /// Hydrate one root row of a class whose schema walk already succeeded, so every
    /// stage resolves before the first child query runs.
    fn hydrate_row(
        ctx: &MappingContext<'_>,
        class: &RepositoryClass,
        executor: &dyn QueryExecutor,
        cursor: &dyn Cursor,
    ) -> Result<Box<dyn Entity>> {
        let mut pass = HydrationPass::new(class.table_name(), executor, cursor);
        let datum = EmbeddedStage.hydrate(ctx, class, None, false, &mut pass)?;
        datum
            .into_object()?
            .ok_or_else(|| FieldAccessError::type_mismatch(class.ty().name()).into())
    }

    /// `SELECT * FROM <table>` and hydrate every row, in result order.
    #[tracing::instrument(level = "debug", skip(self, executor), fields(type_name = std::any::type_name::<T>()))]
    pub fn find_all<T: Mapped>(&self, executor: &dyn QueryExecutor) -> Result<Vec<T>> {
        let ctx = self.context();
        let class = Self::root_class(&ctx, &T::type_ref())?;
        Self::schema_pass(&ctx, &class)?;

        let sql = ctx.builder().select_all(T::TABLE_NAME);
        tracing::trace!(sql = %sql, "Loading root rows");
        let mut records = Vec::new();
        executor.execute_query(&sql, &mut |cursor: &mut dyn Cursor| -> Result<()> {
            while cursor.next()? {
                let entity = Self::hydrate_row(&ctx, &class, executor, &*cursor)?;
                records.push(Datum::Object(entity).into_record::<T>()?);
            }
            Ok(())
        })?;
        Ok(records)
    }

    /// Generate and run the schema of `T`. Returns the number of statements run.
    pub fn create_schema<T: Mapped>(&self, executor: &dyn QueryExecutor) -> Result<usize> {
        let statements = self.generate_schema::<T>()?;
        run_updates(executor, &statements)?;
        Ok(statements.len())
    }

    /// Generate and run the inserts for one instance. Returns the affected row count.
    pub fn persist<T: Mapped>(&self, executor: &dyn QueryExecutor, instance: &T) -> Result<u64> {
        let statements = self.generate_insert(instance)?;
        run_updates(executor, &statements)
    }

    /// Generate and run the update for one instance. Returns the affected row count.
    pub fn update<T: Mapped>(&self, executor: &dyn QueryExecutor, instance: &T) -> Result<u64> {
        let statements = self.generate_update(instance)?;
        run_updates(executor, &statements)
    }
}

//! PostgreSQL storage implementation

use super::traits::*;
use crate::error::StorageError;
use crate::ids::{ClientId, ContractId, VehicleId};
use crate::period::RentalPeriod;
use crate::types::{
    Client, ClientDraft, Contract, ContractState, NewContract, NewVehicle, Vehicle, VehicleState,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Row,
};
use std::time::Duration;

const CLIENT_COLUMNS: &str =
    "id, last_name, first_name, birth_date, license_number, address, email";
const VEHICLE_COLUMNS: &str = "id, make, model, engine_type, color, plate_number, \
     acquisition_date, daily_price_minor, state";
const CONTRACT_COLUMNS: &str =
    "id, client_id, vehicle_id, start_date, end_date, state, total_price_minor";

/// PostgreSQL-backed storage
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to PostgreSQL and initialize schema
    pub async fn connect(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<(), StorageError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS clients (
                id BIGSERIAL PRIMARY KEY,
                last_name TEXT NOT NULL,
                first_name TEXT NOT NULL,
                birth_date DATE NOT NULL,
                license_number TEXT NOT NULL UNIQUE,
                address TEXT,
                email TEXT,
                UNIQUE (last_name, first_name, birth_date)
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS vehicles (
                id BIGSERIAL PRIMARY KEY,
                make TEXT NOT NULL,
                model TEXT NOT NULL,
                engine_type TEXT NOT NULL,
                color TEXT NOT NULL,
                plate_number TEXT NOT NULL UNIQUE,
                acquisition_date DATE,
                daily_price_minor BIGINT NOT NULL,
                state TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS contracts (
                id BIGSERIAL PRIMARY KEY,
                client_id BIGINT NOT NULL REFERENCES clients(id),
                vehicle_id BIGINT NOT NULL REFERENCES vehicles(id),
                start_date DATE NOT NULL,
                end_date DATE NOT NULL,
                state TEXT NOT NULL,
                total_price_minor BIGINT NOT NULL,
                CHECK (end_date >= start_date)
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS contracts_vehicle_state ON contracts(vehicle_id, state);"#,
            r#"CREATE INDEX IF NOT EXISTS contracts_client_id ON contracts(client_id);"#,
        ];

        for stmt in statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Query(e.to_string()))?;
        }

        Ok(())
    }

    fn client_from_row(row: &PgRow) -> Result<Client, StorageError> {
        Ok(Client {
            id: ClientId::new(row.try_get("id").map_err(decode_error)?),
            last_name: row.try_get("last_name").map_err(decode_error)?,
            first_name: row.try_get("first_name").map_err(decode_error)?,
            birth_date: row.try_get("birth_date").map_err(decode_error)?,
            license_number: row.try_get("license_number").map_err(decode_error)?,
            address: row.try_get("address").map_err(decode_error)?,
            email: row.try_get("email").map_err(decode_error)?,
        })
    }

    fn vehicle_from_row(row: &PgRow) -> Result<Vehicle, StorageError> {
        let state: String = row.try_get("state").map_err(decode_error)?;
        let price: i64 = row.try_get("daily_price_minor").map_err(decode_error)?;
        Ok(Vehicle {
            id: VehicleId::new(row.try_get("id").map_err(decode_error)?),
            make: row.try_get("make").map_err(decode_error)?,
            model: row.try_get("model").map_err(decode_error)?,
            engine_type: row.try_get("engine_type").map_err(decode_error)?,
            color: row.try_get("color").map_err(decode_error)?,
            plate_number: row.try_get("plate_number").map_err(decode_error)?,
            acquisition_date: row.try_get("acquisition_date").map_err(decode_error)?,
            daily_price_minor: from_column(price)?,
            state: VehicleState::parse(&state).ok_or_else(|| {
                StorageError::InvalidData(format!("unknown vehicle state {}", state))
            })?,
        })
    }

    fn contract_from_row(row: &PgRow) -> Result<Contract, StorageError> {
        let state: String = row.try_get("state").map_err(decode_error)?;
        let price: i64 = row.try_get("total_price_minor").map_err(decode_error)?;
        Ok(Contract {
            id: ContractId::new(row.try_get("id").map_err(decode_error)?),
            client_id: ClientId::new(row.try_get("client_id").map_err(decode_error)?),
            vehicle_id: VehicleId::new(row.try_get("vehicle_id").map_err(decode_error)?),
            start_date: row.try_get("start_date").map_err(decode_error)?,
            end_date: row.try_get("end_date").map_err(decode_error)?,
            state: ContractState::parse(&state).ok_or_else(|| {
                StorageError::InvalidData(format!("unknown contract state {}", state))
            })?,
            total_price_minor: from_column(price)?,
        })
    }
}

fn decode_error(err: sqlx::Error) -> StorageError {
    StorageError::InvalidData(err.to_string())
}

/// Map driver errors, turning constraint violations into conflicts.
fn query_error(err: sqlx::Error) -> StorageError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
            return StorageError::Conflict(db_err.message().to_string());
        }
    }
    StorageError::Query(err.to_string())
}

fn to_column(value: u64) -> Result<i64, StorageError> {
    i64::try_from(value)
        .map_err(|_| StorageError::InvalidData(format!("amount {} exceeds BIGINT", value)))
}

fn from_column(value: i64) -> Result<u64, StorageError> {
    u64::try_from(value)
        .map_err(|_| StorageError::InvalidData(format!("negative amount {}", value)))
}

#[async_trait]
impl ClientStore for PostgresStore {
    async fn insert_client(&self, draft: ClientDraft) -> StorageResult<Client> {
        let sql = format!(
            "INSERT INTO clients (last_name, first_name, birth_date, license_number, address, email) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            CLIENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&draft.last_name)
            .bind(&draft.first_name)
            .bind(draft.birth_date)
            .bind(&draft.license_number)
            .bind(&draft.address)
            .bind(&draft.email)
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;
        Self::client_from_row(&row)
    }

    async fn get_client(&self, id: ClientId) -> StorageResult<Option<Client>> {
        let sql = format!("SELECT {} FROM clients WHERE id = $1", CLIENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;
        row.as_ref().map(Self::client_from_row).transpose()
    }

    async fn list_clients(&self) -> StorageResult<Vec<Client>> {
        let sql = format!("SELECT {} FROM clients ORDER BY id", CLIENT_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;
        rows.iter().map(Self::client_from_row).collect()
    }

    async fn update_client(&self, client: Client) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE clients SET last_name = $2, first_name = $3, birth_date = $4, \
             license_number = $5, address = $6, email = $7 WHERE id = $1",
        )
        .bind(client.id.value())
        .bind(&client.last_name)
        .bind(&client.first_name)
        .bind(client.birth_date)
        .bind(&client.license_number)
        .bind(&client.address)
        .bind(&client.email)
        .execute(&self.pool)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("{} does not exist", client.id)));
        }
        Ok(())
    }

    async fn delete_client(&self, id: ClientId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn license_exists(
        &self,
        license_number: &str,
        excluding: Option<ClientId>,
    ) -> StorageResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM clients WHERE license_number = $1 AND ($2::BIGINT IS NULL OR id <> $2)",
        )
        .bind(license_number)
        .bind(excluding.map(ClientId::value))
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;
        Ok(row.is_some())
    }

    async fn identity_exists(
        &self,
        last_name: &str,
        first_name: &str,
        birth_date: NaiveDate,
        excluding: Option<ClientId>,
    ) -> StorageResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM clients WHERE last_name = $1 AND first_name = $2 AND birth_date = $3 \
             AND ($4::BIGINT IS NULL OR id <> $4)",
        )
        .bind(last_name)
        .bind(first_name)
        .bind(birth_date)
        .bind(excluding.map(ClientId::value))
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl VehicleStore for PostgresStore {
    async fn insert_vehicle(&self, vehicle: NewVehicle) -> StorageResult<Vehicle> {
        let sql = format!(
            "INSERT INTO vehicles (make, model, engine_type, color, plate_number, \
             acquisition_date, daily_price_minor, state) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            VEHICLE_COLUMNS
        );
        let state = vehicle.state.unwrap_or(VehicleState::Available);
        let row = sqlx::query(&sql)
            .bind(&vehicle.make)
            .bind(&vehicle.model)
            .bind(&vehicle.engine_type)
            .bind(&vehicle.color)
            .bind(&vehicle.plate_number)
            .bind(vehicle.acquisition_date)
            .bind(to_column(vehicle.daily_price_minor)?)
            .bind(state.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;
        Self::vehicle_from_row(&row)
    }

    async fn get_vehicle(&self, id: VehicleId) -> StorageResult<Option<Vehicle>> {
        let sql = format!("SELECT {} FROM vehicles WHERE id = $1", VEHICLE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;
        row.as_ref().map(Self::vehicle_from_row).transpose()
    }

    async fn list_vehicles(&self) -> StorageResult<Vec<Vehicle>> {
        let sql = format!("SELECT {} FROM vehicles ORDER BY id", VEHICLE_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;
        rows.iter().map(Self::vehicle_from_row).collect()
    }

    async fn update_vehicle(&self, vehicle: Vehicle) -> StorageResult<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        write_vehicle(&mut *conn, &vehicle).await
    }

    async fn delete_vehicle(&self, id: VehicleId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn plate_exists(
        &self,
        plate_number: &str,
        excluding: Option<VehicleId>,
    ) -> StorageResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM vehicles WHERE plate_number = $1 AND ($2::BIGINT IS NULL OR id <> $2)",
        )
        .bind(plate_number)
        .bind(excluding.map(VehicleId::value))
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl ContractStore for PostgresStore {
    async fn insert_contract(&self, contract: NewContract) -> StorageResult<Contract> {
        let sql = format!(
            "INSERT INTO contracts (client_id, vehicle_id, start_date, end_date, state, \
             total_price_minor) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            CONTRACT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(contract.client_id.value())
            .bind(contract.vehicle_id.value())
            .bind(contract.period.start())
            .bind(contract.period.end())
            .bind(contract.state.as_str())
            .bind(to_column(contract.total_price_minor)?)
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;
        Self::contract_from_row(&row)
    }

    async fn get_contract(&self, id: ContractId) -> StorageResult<Option<Contract>> {
        let sql = format!("SELECT {} FROM contracts WHERE id = $1", CONTRACT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;
        row.as_ref().map(Self::contract_from_row).transpose()
    }

    async fn list_contracts(&self) -> StorageResult<Vec<Contract>> {
        let sql = format!("SELECT {} FROM contracts ORDER BY id", CONTRACT_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;
        rows.iter().map(Self::contract_from_row).collect()
    }

    async fn list_contracts_for_vehicle(
        &self,
        vehicle_id: VehicleId,
        state: Option<ContractState>,
    ) -> StorageResult<Vec<Contract>> {
        let sql = format!(
            "SELECT {} FROM contracts WHERE vehicle_id = $1 \
             AND ($2::TEXT IS NULL OR state = $2) ORDER BY id",
            CONTRACT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(vehicle_id.value())
            .bind(state.map(ContractState::as_str))
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;
        rows.iter().map(Self::contract_from_row).collect()
    }

    async fn find_overlapping(
        &self,
        vehicle_id: VehicleId,
        period: &RentalPeriod,
    ) -> StorageResult<Vec<Contract>> {
        let sql = format!(
            "SELECT {} FROM contracts WHERE vehicle_id = $1 AND state IN ($2, $3) \
             AND start_date <= $5 AND end_date >= $4 ORDER BY id",
            CONTRACT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(vehicle_id.value())
            .bind(ContractState::Pending.as_str())
            .bind(ContractState::InProgress.as_str())
            .bind(period.start())
            .bind(period.end())
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;
        rows.iter().map(Self::contract_from_row).collect()
    }

    async fn update_contract(&self, contract: Contract) -> StorageResult<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        write_contract(&mut *conn, &contract).await
    }

    async fn delete_contract(&self, id: ContractId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM contracts WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn client_has_contracts(&self, client_id: ClientId) -> StorageResult<bool> {
        let row = sqlx::query("SELECT 1 FROM contracts WHERE client_id = $1 LIMIT 1")
            .bind(client_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(row.is_some())
    }

    async fn vehicle_has_contracts(&self, vehicle_id: VehicleId) -> StorageResult<bool> {
        let row = sqlx::query("SELECT 1 FROM contracts WHERE vehicle_id = $1 LIMIT 1")
            .bind(vehicle_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl Store for PostgresStore {
    fn backend_label(&self) -> &'static str {
        "postgres"
    }

    async fn commit(&self, changes: ChangeSet) -> StorageResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for contract in &changes.contracts {
            write_contract(&mut *tx, contract).await?;
        }
        for vehicle in &changes.vehicles {
            write_vehicle(&mut *tx, vehicle).await?;
        }

        tx.commit().await.map_err(query_error)
    }
}

async fn write_contract(conn: &mut sqlx::PgConnection, contract: &Contract) -> StorageResult<()> {
    let result = sqlx::query(
        "UPDATE contracts SET client_id = $2, vehicle_id = $3, start_date = $4, end_date = $5, \
         state = $6, total_price_minor = $7 WHERE id = $1",
    )
    .bind(contract.id.value())
    .bind(contract.client_id.value())
    .bind(contract.vehicle_id.value())
    .bind(contract.start_date)
    .bind(contract.end_date)
    .bind(contract.state.as_str())
    .bind(to_column(contract.total_price_minor)?)
    .execute(&mut *conn)
    .await
    .map_err(query_error)?;

    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound(format!("{} does not exist", contract.id)));
    }
    Ok(())
}

async fn write_vehicle(conn: &mut sqlx::PgConnection, vehicle: &Vehicle) -> StorageResult<()> {
    let result = sqlx::query(
        "UPDATE vehicles SET make = $2, model = $3, engine_type = $4, color = $5, \
         plate_number = $6, acquisition_date = $7, daily_price_minor = $8, state = $9 \
         WHERE id = $1",
    )
    .bind(vehicle.id.value())
    .bind(&vehicle.make)
    .bind(&vehicle.model)
    .bind(&vehicle.engine_type)
    .bind(&vehicle.color)
    .bind(&vehicle.plate_number)
    .bind(vehicle.acquisition_date)
    .bind(to_column(vehicle.daily_price_minor)?)
    .bind(vehicle.state.as_str())
    .execute(&mut *conn)
    .await
    .map_err(query_error)?;

    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound(format!("{} does not exist", vehicle.id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_beyond_bigint_are_rejected() {
        assert!(matches!(
            to_column(u64::MAX),
            Err(StorageError::InvalidData(_))
        ));
        assert_eq!(to_column(12_500).unwrap(), 12_500);
    }

    #[test]
    fn negative_stored_amounts_are_rejected() {
        assert!(matches!(from_column(-1), Err(StorageError::InvalidData(_))));
        assert_eq!(from_column(0).unwrap(), 0);
    }
}

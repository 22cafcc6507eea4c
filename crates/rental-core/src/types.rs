use crate::error::{RentalError, RentalResult};
use crate::ids::{ClientId, ContractId, VehicleId};
use crate::period::RentalPeriod;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A registered renter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub last_name: String,
    pub first_name: String,
    pub birth_date: NaiveDate,
    /// Driving license number, unique across clients.
    pub license_number: String,
    /// Postal address. Not every client has one on file.
    pub address: Option<String>,
    pub email: Option<String>,
}

/// Client fields supplied on registration or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDraft {
    pub last_name: String,
    pub first_name: String,
    pub birth_date: NaiveDate,
    pub license_number: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ClientDraft {
    pub fn validate(&self) -> RentalResult<()> {
        require_text("last_name", &self.last_name)?;
        require_text("first_name", &self.first_name)?;
        require_text("license_number", &self.license_number)
    }

    pub fn into_client(self, id: ClientId) -> Client {
        Client {
            id,
            last_name: self.last_name,
            first_name: self.first_name,
            birth_date: self.birth_date,
            license_number: self.license_number,
            address: self.address,
            email: self.email,
        }
    }
}

/// Operational state of a fleet vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleState {
    Available,
    Rented,
    BrokenDown,
}

impl VehicleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Rented => "RENTED",
            Self::BrokenDown => "BROKEN_DOWN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "AVAILABLE" => Some(Self::Available),
            "RENTED" => Some(Self::Rented),
            "BROKEN_DOWN" => Some(Self::BrokenDown),
            _ => None,
        }
    }
}

/// A fleet vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub make: String,
    pub model: String,
    pub engine_type: String,
    pub color: String,
    /// Registration plate, unique across the fleet.
    pub plate_number: String,
    pub acquisition_date: Option<NaiveDate>,
    /// Daily rental price in minor currency units.
    pub daily_price_minor: u64,
    pub state: VehicleState,
}

/// Vehicle registration request. `state` defaults to [`VehicleState::Available`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVehicle {
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub engine_type: String,
    #[serde(default)]
    pub color: String,
    pub plate_number: String,
    #[serde(default)]
    pub acquisition_date: Option<NaiveDate>,
    #[serde(default)]
    pub daily_price_minor: u64,
    #[serde(default)]
    pub state: Option<VehicleState>,
}

impl NewVehicle {
    pub fn new(plate_number: impl Into<String>, daily_price_minor: u64) -> Self {
        Self {
            make: String::new(),
            model: String::new(),
            engine_type: String::new(),
            color: String::new(),
            plate_number: plate_number.into(),
            acquisition_date: None,
            daily_price_minor,
            state: None,
        }
    }

    pub fn with_description(
        mut self,
        make: impl Into<String>,
        model: impl Into<String>,
        engine_type: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        self.make = make.into();
        self.model = model.into();
        self.engine_type = engine_type.into();
        self.color = color.into();
        self
    }

    pub fn with_state(mut self, state: VehicleState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn validate(&self) -> RentalResult<()> {
        require_text("plate_number", &self.plate_number)
    }
}

/// Editable vehicle fields. The state only moves through rental rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleUpdate {
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub engine_type: String,
    #[serde(default)]
    pub color: String,
    pub plate_number: String,
    #[serde(default)]
    pub acquisition_date: Option<NaiveDate>,
    #[serde(default)]
    pub daily_price_minor: u64,
}

impl VehicleUpdate {
    pub fn validate(&self) -> RentalResult<()> {
        require_text("plate_number", &self.plate_number)
    }

    pub fn apply_to(self, vehicle: &mut Vehicle) {
        vehicle.make = self.make;
        vehicle.model = self.model;
        vehicle.engine_type = self.engine_type;
        vehicle.color = self.color;
        vehicle.plate_number = self.plate_number;
        vehicle.acquisition_date = self.acquisition_date;
        vehicle.daily_price_minor = self.daily_price_minor;
    }
}

/// Contract lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractState {
    Pending,
    InProgress,
    Late,
    Cancelled,
    Completed,
}

impl ContractState {
    /// States that hold the vehicle's calendar slot.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    pub fn can_terminate(self) -> bool {
        matches!(self, Self::InProgress | Self::Late)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Late => "LATE",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "LATE" => Some(Self::Late),
            "CANCELLED" => Some(Self::Cancelled),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A booking of one vehicle by one client over an inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub client_id: ClientId,
    pub vehicle_id: VehicleId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub state: ContractState,
    /// Daily price times billable days, in minor currency units.
    pub total_price_minor: u64,
}

impl Contract {
    pub fn period(&self) -> RentalPeriod {
        RentalPeriod::from_stored(self.start_date, self.end_date)
    }
}

/// Contract record ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContract {
    pub client_id: ClientId,
    pub vehicle_id: VehicleId,
    pub period: RentalPeriod,
    pub state: ContractState,
    pub total_price_minor: u64,
}

impl NewContract {
    pub fn into_contract(self, id: ContractId) -> Contract {
        Contract {
            id,
            client_id: self.client_id,
            vehicle_id: self.vehicle_id,
            start_date: self.period.start(),
            end_date: self.period.end(),
            state: self.state,
            total_price_minor: self.total_price_minor,
        }
    }
}

/// Booking request accepted by contract creation and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub client_id: ClientId,
    pub vehicle_id: VehicleId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl BookingRequest {
    pub fn new(
        client_id: ClientId,
        vehicle_id: VehicleId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            client_id,
            vehicle_id,
            start_date,
            end_date,
        }
    }

    pub fn period(&self) -> RentalResult<RentalPeriod> {
        RentalPeriod::new(self.start_date, self.end_date)
    }
}

fn require_text(field: &str, value: &str) -> RentalResult<()> {
    if value.trim().is_empty() {
        return Err(RentalError::Validation(format!("{} must not be blank", field)));
    }
    Ok(())
}

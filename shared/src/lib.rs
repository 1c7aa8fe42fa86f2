use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an authenticated user. The auth provider supplies the principal
/// id; this enum decides which dashboard and which lifecycle transitions
/// that principal is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Parent,
    DeliveryStaff,
    SchoolAdmin,
    SystemAdmin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Parent => "parent",
            UserRole::DeliveryStaff => "delivery_staff",
            UserRole::SchoolAdmin => "school_admin",
            UserRole::SystemAdmin => "system_admin",
        };
        write!(f, "{}", s)
    }
}

impl UserRole {
    /// Parse the wire form used in headers and CSV columns.
    pub fn parse(s: &str) -> Option<UserRole> {
        match s {
            "parent" => Some(UserRole::Parent),
            "delivery_staff" => Some(UserRole::DeliveryStaff),
            "school_admin" => Some(UserRole::SchoolAdmin),
            "system_admin" => Some(UserRole::SystemAdmin),
            _ => None,
        }
    }
}

/// Lifecycle status of a booking. `PickedUp`/`InTransit`/`Delivered` are
/// projections of the paired delivery's status; the rest are booking-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::PickedUp => "picked_up",
            BookingStatus::InTransit => "in_transit",
            BookingStatus::Delivered => "delivered",
            BookingStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

impl BookingStatus {
    pub fn parse(s: &str) -> Option<BookingStatus> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "picked_up" => Some(BookingStatus::PickedUp),
            "in_transit" => Some(BookingStatus::InTransit),
            "delivered" => Some(BookingStatus::Delivered),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// Lifecycle status of a delivery: assigned -> picked_up -> in_transit ->
/// delivered, with `failed` as the terminal failure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Assigned,
    PickedUp,
    InTransit,
    Delivered,
    Failed,
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeliveryStatus::Assigned => "assigned",
            DeliveryStatus::PickedUp => "picked_up",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

impl DeliveryStatus {
    pub fn parse(s: &str) -> Option<DeliveryStatus> {
        match s {
            "assigned" => Some(DeliveryStatus::Assigned),
            "picked_up" => Some(DeliveryStatus::PickedUp),
            "in_transit" => Some(DeliveryStatus::InTransit),
            "delivered" => Some(DeliveryStatus::Delivered),
            "failed" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }
}

/// Repetition pattern for a recurring booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurringPattern {
    Daily,
    Weekly,
}

impl fmt::Display for RecurringPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecurringPattern::Daily => "daily",
            RecurringPattern::Weekly => "weekly",
        };
        write!(f, "{}", s)
    }
}

impl RecurringPattern {
    pub fn parse(s: &str) -> Option<RecurringPattern> {
        match s {
            "daily" => Some(RecurringPattern::Daily),
            "weekly" => Some(RecurringPattern::Weekly),
            _ => None,
        }
    }
}

/// Status of a (simulated) payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        };
        write!(f, "{}", s)
    }
}

impl PaymentStatus {
    pub fn parse(s: &str) -> Option<PaymentStatus> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// Status of a meal-plan subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

impl SubscriptionStatus {
    pub fn parse(s: &str) -> Option<SubscriptionStatus> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "cancelled" => Some(SubscriptionStatus::Cancelled),
            "expired" => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }
}

/// Billing cadence of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanType::Daily => "daily",
            PlanType::Weekly => "weekly",
            PlanType::Monthly => "monthly",
        };
        write!(f, "{}", s)
    }
}

impl PlanType {
    pub fn parse(s: &str) -> Option<PlanType> {
        match s {
            "daily" => Some(PlanType::Daily),
            "weekly" => Some(PlanType::Weekly),
            "monthly" => Some(PlanType::Monthly),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Entity DTOs. Dates and times travel as strings over the wire (YYYY-MM-DD,
// HH:MM, RFC 3339 timestamps); the backend parses and validates them.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDto {
    pub id: String,
    pub child_id: String,
    pub parent_id: String,
    /// Requested delivery date (YYYY-MM-DD)
    pub delivery_date: String,
    /// Pickup time window start (HH:MM)
    pub pickup_time: String,
    /// Expected delivery time (HH:MM)
    pub delivery_time: String,
    pub special_instructions: Option<String>,
    pub is_recurring: bool,
    pub recurring_pattern: Option<RecurringPattern>,
    pub recurring_end_date: Option<String>,
    pub status: BookingStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDto {
    pub id: String,
    pub booking_id: String,
    pub delivery_staff_id: Option<String>,
    pub school_id: String,
    /// Occurrence date this delivery fulfils (YYYY-MM-DD)
    pub scheduled_date: String,
    /// Opaque tracking identifier printed as the lunchbox QR code
    pub qr_code: String,
    pub pickup_time_actual: Option<String>,
    pub delivery_time_actual: Option<String>,
    pub status: DeliveryStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildDto {
    pub id: String,
    pub parent_id: String,
    pub school_id: String,
    pub name: String,
    pub class_name: String,
    pub allergies: Option<String>,
    pub special_notes: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolDto {
    pub id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    /// Start of the lunch window (HH:MM)
    pub lunch_time_start: String,
    /// End of the lunch window (HH:MM)
    pub lunch_time_end: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: String,
    pub email: String,
    pub role: UserRole,
    pub full_name: String,
    pub phone: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDto {
    pub id: String,
    pub user_id: String,
    pub booking_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionDto {
    pub id: String,
    pub user_id: String,
    pub plan_type: PlanType,
    pub amount: f64,
    pub start_date: String,
    pub end_date: String,
    pub status: SubscriptionStatus,
    pub created_at: String,
    pub updated_at: String,
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub child_id: String,
    pub delivery_date: String,
    pub pickup_time: String,
    pub delivery_time: String,
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurring_pattern: Option<RecurringPattern>,
    pub recurring_end_date: Option<String>,
}

/// A booking together with the deliveries materialized for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingResponse {
    pub booking: BookingDto,
    pub deliveries: Vec<DeliveryDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryListResponse {
    pub deliveries: Vec<DeliveryDto>,
}

/// Requested status change for a delivery resolved by its tracking code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDeliveryStatusRequest {
    pub status: DeliveryStatus,
}

/// Attach a staff member to a delivery awaiting pickup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignStaffRequest {
    pub staff_id: String,
}

/// Delivery plus the booking it fulfils, as returned by the scan endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub delivery: DeliveryDto,
    pub booking: BookingDto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateChildRequest {
    pub school_id: String,
    pub name: String,
    pub class_name: String,
    pub allergies: Option<String>,
    pub special_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateChildRequest {
    pub name: Option<String>,
    pub class_name: Option<String>,
    pub allergies: Option<String>,
    pub special_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildListResponse {
    pub children: Vec<ChildDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSchoolRequest {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub lunch_time_start: String,
    pub lunch_time_end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSchoolRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub lunch_time_start: Option<String>,
    pub lunch_time_end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolListResponse {
    pub schools: Vec<SchoolDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub role: UserRole,
    pub full_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub booking_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub plan_type: PlanType,
    pub amount: f64,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionListResponse {
    pub subscriptions: Vec<SubscriptionDto>,
}

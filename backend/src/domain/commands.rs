//! Domain-level command and result types.
//!
//! These structs are used by the services inside the domain layer and are
//! not exposed over the public API; the REST layer maps the DTOs in the
//! `shared` crate onto them. Dates and times arrive as strings and are
//! parsed (and validated) by the services.

pub mod bookings {
    use crate::domain::models::{Booking, Delivery};
    use shared::RecurringPattern;

    /// Input for creating a new booking.
    #[derive(Debug, Clone)]
    pub struct CreateBookingCommand {
        pub child_id: String,
        /// Requested delivery date (YYYY-MM-DD)
        pub delivery_date: String,
        /// Pickup time (HH:MM)
        pub pickup_time: String,
        /// Expected delivery time (HH:MM)
        pub delivery_time: String,
        pub special_instructions: Option<String>,
        pub is_recurring: bool,
        pub recurring_pattern: Option<RecurringPattern>,
        pub recurring_end_date: Option<String>,
    }

    /// Result of creating a booking: the booking plus every delivery
    /// materialized for it.
    #[derive(Debug, Clone)]
    pub struct CreateBookingResult {
        pub booking: Booking,
        pub deliveries: Vec<Delivery>,
    }

    #[derive(Debug, Clone)]
    pub struct CancelBookingCommand {
        pub booking_id: String,
    }

    #[derive(Debug, Clone)]
    pub struct CancelBookingResult {
        pub booking: Booking,
        /// Deliveries that were failed as part of the cancellation.
        pub failed_deliveries: Vec<Delivery>,
    }

    #[derive(Debug, Clone)]
    pub struct ListBookingsResult {
        pub bookings: Vec<Booking>,
    }

    /// A booking together with its materialized deliveries.
    #[derive(Debug, Clone)]
    pub struct GetBookingResult {
        pub booking: Booking,
        pub deliveries: Vec<Delivery>,
    }
}

pub mod deliveries {
    use crate::domain::models::{Booking, Delivery};
    use shared::DeliveryStatus;

    /// Requested status change for the delivery behind a tracking code.
    #[derive(Debug, Clone)]
    pub struct ApplyTransitionCommand {
        pub qr_code: String,
        pub requested_status: DeliveryStatus,
    }

    /// Result of a successful transition. `booking` reflects the projected
    /// status, or is returned untouched for the `failed` path.
    #[derive(Debug, Clone)]
    pub struct ApplyTransitionResult {
        pub delivery: Delivery,
        pub booking: Booking,
    }

    /// Delivery resolved by tracking code together with its booking.
    #[derive(Debug, Clone)]
    pub struct ScanResult {
        pub delivery: Delivery,
        pub booking: Booking,
    }

    #[derive(Debug, Clone)]
    pub struct AssignStaffCommand {
        pub delivery_id: String,
        pub staff_id: String,
    }

    #[derive(Debug, Clone)]
    pub struct AssignStaffResult {
        pub delivery: Delivery,
    }

    /// A staff member's deliveries for one day, in drop-off order.
    #[derive(Debug, Clone)]
    pub struct RoutePlanResult {
        pub deliveries: Vec<Delivery>,
    }

    /// Deliveries arriving at one school on one day.
    #[derive(Debug, Clone)]
    pub struct SchoolDeliveriesResult {
        pub deliveries: Vec<Delivery>,
    }
}

pub mod children {
    use crate::domain::models::Child;

    #[derive(Debug, Clone)]
    pub struct CreateChildCommand {
        pub school_id: String,
        pub name: String,
        pub class_name: String,
        pub allergies: Option<String>,
        pub special_notes: Option<String>,
    }

    #[derive(Debug, Clone)]
    pub struct UpdateChildCommand {
        pub child_id: String,
        pub name: Option<String>,
        pub class_name: Option<String>,
        pub allergies: Option<String>,
        pub special_notes: Option<String>,
    }

    #[derive(Debug, Clone)]
    pub struct CreateChildResult {
        pub child: Child,
    }

    #[derive(Debug, Clone)]
    pub struct UpdateChildResult {
        pub child: Child,
    }

    #[derive(Debug, Clone)]
    pub struct ListChildrenResult {
        pub children: Vec<Child>,
    }
}

pub mod schools {
    use crate::domain::models::School;

    #[derive(Debug, Clone)]
    pub struct CreateSchoolCommand {
        pub name: String,
        pub address: String,
        pub phone: String,
        pub email: String,
        /// Lunch window start (HH:MM)
        pub lunch_time_start: String,
        /// Lunch window end (HH:MM)
        pub lunch_time_end: String,
    }

    #[derive(Debug, Clone)]
    pub struct UpdateSchoolCommand {
        pub school_id: String,
        pub name: Option<String>,
        pub address: Option<String>,
        pub phone: Option<String>,
        pub email: Option<String>,
        pub lunch_time_start: Option<String>,
        pub lunch_time_end: Option<String>,
    }

    #[derive(Debug, Clone)]
    pub struct CreateSchoolResult {
        pub school: School,
    }

    #[derive(Debug, Clone)]
    pub struct UpdateSchoolResult {
        pub school: School,
    }

    #[derive(Debug, Clone)]
    pub struct ListSchoolsResult {
        pub schools: Vec<School>,
    }
}

pub mod users {
    use crate::domain::models::User;
    use shared::UserRole;

    #[derive(Debug, Clone)]
    pub struct CreateUserCommand {
        pub email: String,
        pub role: UserRole,
        pub full_name: String,
        pub phone: String,
    }

    #[derive(Debug, Clone)]
    pub struct UpdateUserCommand {
        pub user_id: String,
        pub email: Option<String>,
        pub full_name: Option<String>,
        pub phone: Option<String>,
    }

    #[derive(Debug, Clone)]
    pub struct CreateUserResult {
        pub user: User,
    }

    #[derive(Debug, Clone)]
    pub struct UpdateUserResult {
        pub user: User,
    }

    #[derive(Debug, Clone)]
    pub struct ListUsersResult {
        pub users: Vec<User>,
    }
}

pub mod payments {
    use crate::domain::models::Payment;

    #[derive(Debug, Clone)]
    pub struct CreatePaymentCommand {
        pub booking_id: Option<String>,
        pub amount: f64,
        pub currency: String,
        pub payment_method: String,
    }

    #[derive(Debug, Clone)]
    pub struct CreatePaymentResult {
        pub payment: Payment,
    }

    #[derive(Debug, Clone)]
    pub struct ListPaymentsResult {
        pub payments: Vec<Payment>,
    }
}

pub mod subscriptions {
    use crate::domain::models::Subscription;
    use shared::PlanType;

    #[derive(Debug, Clone)]
    pub struct CreateSubscriptionCommand {
        pub plan_type: PlanType,
        pub amount: f64,
        /// Start date (YYYY-MM-DD)
        pub start_date: String,
        /// End date (YYYY-MM-DD)
        pub end_date: String,
    }

    #[derive(Debug, Clone)]
    pub struct CreateSubscriptionResult {
        pub subscription: Subscription,
    }

    #[derive(Debug, Clone)]
    pub struct ListSubscriptionsResult {
        pub subscriptions: Vec<Subscription>,
    }
}

//! Roles, operations and the permission table.
//!
//! Authorization is data: every protected handler names one [`Operation`], and
//! [`allowed_roles`] maps it to the roles that may perform it. Handlers take the
//! operation as a zero-sized [`Policy`] type so the check happens in the
//! extractor, before the handler body runs.

use serde::{Deserialize, Serialize};

/// User role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Everything, including user management.
    Admin,
    /// Store management: catalog, stock, locations, order workflow.
    Manager,
    /// Counter staff: sales, orders, customers and read access.
    Staff,
}

impl Role {
    /// Whether this role may perform `op`.
    #[must_use]
    pub fn can(self, op: Operation) -> bool {
        allowed_roles(op).contains(&self)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Manager => write!(f, "manager"),
            Self::Staff => write!(f, "staff"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "staff" => Ok(Self::Staff),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Every protected operation in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ViewCatalog,
    ManageCatalog,
    ViewStock,
    ReceiveStock,
    TransferStock,
    DeleteStockLot,
    ViewSales,
    CreateSale,
    CollectDue,
    ViewOrders,
    CreateOrder,
    UpdateOrderStatus,
    ViewCustomers,
    ManageCustomers,
    ViewLocations,
    ManageLocations,
    ViewDemands,
    CreateDemand,
    DecideDemand,
    ManageUsers,
}

const EVERYONE: &[Role] = &[Role::Admin, Role::Manager, Role::Staff];
const MANAGEMENT: &[Role] = &[Role::Admin, Role::Manager];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Roles allowed to perform `op`.
#[must_use]
pub const fn allowed_roles(op: Operation) -> &'static [Role] {
    match op {
        Operation::ViewCatalog
        | Operation::ViewStock
        | Operation::ViewSales
        | Operation::CreateSale
        | Operation::CollectDue
        | Operation::ViewOrders
        | Operation::CreateOrder
        | Operation::ViewCustomers
        | Operation::ManageCustomers
        | Operation::ViewLocations
        | Operation::ViewDemands
        | Operation::CreateDemand => EVERYONE,

        Operation::ManageCatalog
        | Operation::ReceiveStock
        | Operation::TransferStock
        | Operation::DeleteStockLot
        | Operation::UpdateOrderStatus
        | Operation::ManageLocations
        | Operation::DecideDemand => MANAGEMENT,

        Operation::ManageUsers => ADMIN_ONLY,
    }
}

/// A compile-time name for an [`Operation`], used as the type parameter of the
/// server's `Authorized<P>` extractor.
pub trait Policy: Send + Sync + 'static {
    /// The operation this policy guards.
    const OPERATION: Operation;
}

macro_rules! policies {
    ($($name:ident => $op:ident),+ $(,)?) => {
        /// Zero-sized policy types, one per [`Operation`].
        pub mod policy {
            use super::{Operation, Policy};

            $(
                #[doc = concat!("Requires [`Operation::", stringify!($op), "`].")]
                #[derive(Debug, Clone, Copy)]
                pub struct $name;

                impl Policy for $name {
                    const OPERATION: Operation = Operation::$op;
                }
            )+
        }
    };
}

policies! {
    ViewCatalog => ViewCatalog,
    ManageCatalog => ManageCatalog,
    ViewStock => ViewStock,
    ReceiveStock => ReceiveStock,
    TransferStock => TransferStock,
    DeleteStockLot => DeleteStockLot,
    ViewSales => ViewSales,
    CreateSale => CreateSale,
    CollectDue => CollectDue,
    ViewOrders => ViewOrders,
    CreateOrder => CreateOrder,
    UpdateOrderStatus => UpdateOrderStatus,
    ViewCustomers => ViewCustomers,
    ManageCustomers => ManageCustomers,
    ViewLocations => ViewLocations,
    ManageLocations => ManageLocations,
    ViewDemands => ViewDemands,
    CreateDemand => CreateDemand,
    DecideDemand => DecideDemand,
    ManageUsers => ManageUsers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_can_sell_but_not_manage() {
        assert!(Role::Staff.can(Operation::CreateSale));
        assert!(Role::Staff.can(Operation::CreateOrder));
        assert!(Role::Staff.can(Operation::ManageCustomers));
        assert!(!Role::Staff.can(Operation::ReceiveStock));
        assert!(!Role::Staff.can(Operation::ManageCatalog));
        assert!(!Role::Staff.can(Operation::UpdateOrderStatus));
    }

    #[test]
    fn test_only_admin_manages_users() {
        assert!(Role::Admin.can(Operation::ManageUsers));
        assert!(!Role::Manager.can(Operation::ManageUsers));
        assert!(!Role::Staff.can(Operation::ManageUsers));
    }

    #[test]
    fn test_admin_can_do_everything_manager_can() {
        let ops = [
            Operation::ManageCatalog,
            Operation::ReceiveStock,
            Operation::TransferStock,
            Operation::DeleteStockLot,
            Operation::UpdateOrderStatus,
            Operation::ManageLocations,
            Operation::DecideDemand,
        ];
        for op in ops {
            assert!(Role::Manager.can(op), "{op:?}");
            assert!(Role::Admin.can(op), "{op:?}");
        }
    }

    #[test]
    fn test_policy_operation() {
        assert_eq!(
            <policy::ManageUsers as Policy>::OPERATION,
            Operation::ManageUsers
        );
        assert_eq!(<policy::CreateSale as Policy>::OPERATION, Operation::CreateSale);
    }

    #[test]
    fn test_role_round_trip_str() {
        for role in [Role::Admin, Role::Manager, Role::Staff] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        assert!("owner".parse::<Role>().is_err());
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed vocabulary of employee permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmployeeRole {
    #[serde(rename = "manage employees")]
    ManageEmployees,
    #[serde(rename = "view employees")]
    ViewEmployees,
    #[serde(rename = "manage customers")]
    ManageCustomers,
    #[serde(rename = "view customers")]
    ViewCustomers,
    #[serde(rename = "manage menu items")]
    ManageMenuItems,
    #[serde(rename = "view menu items")]
    ViewMenuItems,
    #[serde(rename = "post order")]
    PostOrder,
    #[serde(rename = "view my orders")]
    ViewMyOrders,
    #[serde(rename = "view all orders")]
    ViewAllOrders,
    #[serde(rename = "update order")]
    UpdateOrder,
    #[serde(rename = "void order")]
    VoidOrder,
    #[serde(rename = "gift order")]
    GiftOrder,
    #[serde(rename = "settle order")]
    SettleOrder,
    #[serde(rename = "transfer order")]
    TransferOrder,
    #[serde(rename = "generate my sales report")]
    GenerateMySalesReport,
    #[serde(rename = "generate all sales report")]
    GenerateAllSalesReport,
    #[serde(rename = "manage inventory items")]
    ManageInventoryItems,
    #[serde(rename = "view inventory items")]
    ViewInventoryItems,
    #[serde(rename = "generate my inventory report")]
    GenerateMyInventoryReport,
    #[serde(rename = "issue")]
    Issue,
    #[serde(rename = "view issue")]
    ViewIssue,
    #[serde(rename = "update issue")]
    UpdateIssue,
    #[serde(rename = "purchase")]
    Purchase,
    #[serde(rename = "view purchase")]
    ViewPurchase,
    #[serde(rename = "update purchase")]
    UpdatePurchase,
    #[serde(rename = "manage kitchen")]
    ManageKitchen,
}

impl EmployeeRole {
    pub const ALL: [EmployeeRole; 26] = [
        EmployeeRole::ManageEmployees,
        EmployeeRole::ViewEmployees,
        EmployeeRole::ManageCustomers,
        EmployeeRole::ViewCustomers,
        EmployeeRole::ManageMenuItems,
        EmployeeRole::ViewMenuItems,
        EmployeeRole::PostOrder,
        EmployeeRole::ViewMyOrders,
        EmployeeRole::ViewAllOrders,
        EmployeeRole::UpdateOrder,
        EmployeeRole::VoidOrder,
        EmployeeRole::GiftOrder,
        EmployeeRole::SettleOrder,
        EmployeeRole::TransferOrder,
        EmployeeRole::GenerateMySalesReport,
        EmployeeRole::GenerateAllSalesReport,
        EmployeeRole::ManageInventoryItems,
        EmployeeRole::ViewInventoryItems,
        EmployeeRole::GenerateMyInventoryReport,
        EmployeeRole::Issue,
        EmployeeRole::ViewIssue,
        EmployeeRole::UpdateIssue,
        EmployeeRole::Purchase,
        EmployeeRole::ViewPurchase,
        EmployeeRole::UpdatePurchase,
        EmployeeRole::ManageKitchen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeRole::ManageEmployees => "manage employees",
            EmployeeRole::ViewEmployees => "view employees",
            EmployeeRole::ManageCustomers => "manage customers",
            EmployeeRole::ViewCustomers => "view customers",
            EmployeeRole::ManageMenuItems => "manage menu items",
            EmployeeRole::ViewMenuItems => "view menu items",
            EmployeeRole::PostOrder => "post order",
            EmployeeRole::ViewMyOrders => "view my orders",
            EmployeeRole::ViewAllOrders => "view all orders",
            EmployeeRole::UpdateOrder => "update order",
            EmployeeRole::VoidOrder => "void order",
            EmployeeRole::GiftOrder => "gift order",
            EmployeeRole::SettleOrder => "settle order",
            EmployeeRole::TransferOrder => "transfer order",
            EmployeeRole::GenerateMySalesReport => "generate my sales report",
            EmployeeRole::GenerateAllSalesReport => "generate all sales report",
            EmployeeRole::ManageInventoryItems => "manage inventory items",
            EmployeeRole::ViewInventoryItems => "view inventory items",
            EmployeeRole::GenerateMyInventoryReport => "generate my inventory report",
            EmployeeRole::Issue => "issue",
            EmployeeRole::ViewIssue => "view issue",
            EmployeeRole::UpdateIssue => "update issue",
            EmployeeRole::Purchase => "purchase",
            EmployeeRole::ViewPurchase => "view purchase",
            EmployeeRole::UpdatePurchase => "update purchase",
            EmployeeRole::ManageKitchen => "manage kitchen",
        }
    }
}

impl fmt::Display for EmployeeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for EmployeeRole {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        EmployeeRole::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| UnknownRole(value.to_owned()))
    }
}

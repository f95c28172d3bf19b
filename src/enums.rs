use std::fmt;
use std::str::FromStr;

use serde::{ Deserialize, Serialize };

use crate::error::AppError;

// ─── Role ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Usuario,
    Administrador,
}

impl Role {
    /// Canonical string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Usuario => "usuario",
            Role::Administrador => "administrador",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Administrador)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "usuario" => Ok(Role::Usuario),
            "administrador" => Ok(Role::Administrador),
            _ => Err(AppError::Validation(format!("Invalid role: {}", s))),
        }
    }
}

// ─── TxStatus ────────────────────────────────────────────────────────

/// Lifecycle of a transfer.
///
/// ```text
/// Creando → Método seleccionado → en pago → Procesando → Completado
///                                                      ↘ Cancelada
/// ```
///
/// Admins may move any state to either terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxStatus {
    #[serde(rename = "Creando")]
    Creando,
    #[serde(rename = "Método seleccionado")]
    MetodoSeleccionado,
    #[serde(rename = "en pago")]
    EnPago,
    #[serde(rename = "Procesando")]
    Procesando,
    #[serde(rename = "Completado")]
    Completado,
    #[serde(rename = "Cancelada")]
    Cancelada,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Creando => "Creando",
            TxStatus::MetodoSeleccionado => "Método seleccionado",
            TxStatus::EnPago => "en pago",
            TxStatus::Procesando => "Procesando",
            TxStatus::Completado => "Completado",
            TxStatus::Cancelada => "Cancelada",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Completado | TxStatus::Cancelada)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "creando" => Ok(TxStatus::Creando),
            "método seleccionado" | "metodo seleccionado" => Ok(TxStatus::MetodoSeleccionado),
            "en pago" => Ok(TxStatus::EnPago),
            "procesando" => Ok(TxStatus::Procesando),
            "completado" => Ok(TxStatus::Completado),
            "cancelada" => Ok(TxStatus::Cancelada),
            _ => Err(AppError::Validation(format!("Invalid transaction status: {}", s))),
        }
    }
}

// ─── RateOperation ───────────────────────────────────────────────────

/// How a quoted rate combines with the origin amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateOperation {
    Multiply,
    Divide,
}

impl RateOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateOperation::Multiply => "multiply",
            RateOperation::Divide => "divide",
        }
    }
}

impl fmt::Display for RateOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateOperation {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multiply" => Ok(RateOperation::Multiply),
            "divide" => Ok(RateOperation::Divide),
            _ => Err(AppError::Validation(format!("Invalid rate operation: {}", s))),
        }
    }
}

// ─── CodePurpose ─────────────────────────────────────────────────────

/// Flow a verification code was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePurpose {
    /// Account creation; the code row stages the password hash.
    Signup,
    /// Standalone phone check exposed by the legacy endpoints.
    PhoneVerification,
    PasswordReset,
}

impl CodePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodePurpose::Signup => "signup",
            CodePurpose::PhoneVerification => "phone_verification",
            CodePurpose::PasswordReset => "password_reset",
        }
    }

    /// Number of digits in codes issued for this purpose.
    pub fn code_len(&self) -> u32 {
        match self {
            CodePurpose::Signup => 4,
            CodePurpose::PhoneVerification | CodePurpose::PasswordReset => 6,
        }
    }
}

impl fmt::Display for CodePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodePurpose {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "signup" => Ok(CodePurpose::Signup),
            "phone_verification" => Ok(CodePurpose::PhoneVerification),
            "password_reset" => Ok(CodePurpose::PasswordReset),
            _ => Err(AppError::Validation(format!("Invalid code purpose: {}", s))),
        }
    }
}

// ─── MethodKind ──────────────────────────────────────────────────────

/// Shape of a destination payment method, derived from its display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    BankTransfer,
    MobilePayment,
    DigitalWallet,
    CashPickup,
}

impl MethodKind {
    /// Classify a method name such as `Pago móvil`, `Bancolombia` or `Zelle`.
    pub fn from_method_name(name: &str) -> Self {
        let name = name.trim().to_lowercase();

        if name.contains("pago móvil") || name.contains("pago movil") {
            MethodKind::MobilePayment
        } else if
            name.contains("transferencia") ||
            name.contains("banco") ||
            name.contains("bancolombia") ||
            name.contains("bank") ||
            name.contains("wire")
        {
            MethodKind::BankTransfer
        } else if name.contains("efectivo") || name.contains("western union") || name == "cash" {
            MethodKind::CashPickup
        } else {
            MethodKind::DigitalWallet
        }
    }
}

use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use log::warn;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::env;

// Type aliases
pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

// Database initialization SQL - runs once at startup, idempotent
pub const DB_INIT_SQL: &str = r#"
-- Create tables if they don't exist
CREATE TABLE IF NOT EXISTS app_user (
    id SERIAL PRIMARY KEY,
    employee_no VARCHAR(45),
    username VARCHAR(255) UNIQUE NOT NULL,
    password VARCHAR(255) NOT NULL,
    employee_status VARCHAR(45),
    user_role INTEGER,
    user_type VARCHAR(20) NOT NULL,
    employment VARCHAR(3) NOT NULL DEFAULT 'No'
);

CREATE TABLE IF NOT EXISTS designation_department (
    id SERIAL PRIMARY KEY,
    designation VARCHAR(100) NOT NULL,
    department VARCHAR(100) NOT NULL
);

CREATE TABLE IF NOT EXISTS employee (
    employee_no VARCHAR(45) PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    name_initial VARCHAR(100),
    calling_name VARCHAR(100),
    nic VARCHAR(20),
    date_of_birth DATE,
    contact_number VARCHAR(20),
    address VARCHAR(255),
    employee_category VARCHAR(20) NOT NULL,
    employee_type VARCHAR(45),
    department_designation_id INTEGER,
    work_location VARCHAR(100),
    active_status VARCHAR(20) NOT NULL DEFAULT 'Active'
);

CREATE TABLE IF NOT EXISTS client (
    id SERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    email VARCHAR(255) UNIQUE NOT NULL,
    phone VARCHAR(20) NOT NULL,
    address VARCHAR(255),
    created_at TIMESTAMP NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMP NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS employee_client_assignment (
    id SERIAL PRIMARY KEY,
    client_id INTEGER NOT NULL,
    employee_no VARCHAR(45) NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_employee_client UNIQUE (client_id, employee_no)
);

CREATE TABLE IF NOT EXISTS roles (
    id SERIAL PRIMARY KEY,
    role_name VARCHAR(100) NOT NULL,
    role_description VARCHAR(255)
);

CREATE TABLE IF NOT EXISTS permissions (
    id SERIAL PRIMARY KEY,
    permission_name VARCHAR(100) UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS role_permissions (
    role_id INTEGER NOT NULL,
    permission_id INTEGER NOT NULL,
    PRIMARY KEY (role_id, permission_id)
);

CREATE TABLE IF NOT EXISTS checkpoint (
    id SERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    client_id INTEGER NOT NULL,
    employee_ids TEXT[] NOT NULL DEFAULT '{}',
    location_name VARCHAR(255) NOT NULL,
    location_address TEXT NOT NULL,
    qr_code_url VARCHAR(255) NOT NULL DEFAULT '',
    created_at TIMESTAMP NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS scanned_detail (
    id SERIAL PRIMARY KEY,
    employee_no VARCHAR(45) NOT NULL,
    checkpoint_id INTEGER NOT NULL,
    location_name VARCHAR(255) NOT NULL,
    scan_date DATE NOT NULL,
    scan_time TIME NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS refresh_tokens (
    employee_no VARCHAR(255) PRIMARY KEY,
    token VARCHAR(512) NOT NULL,
    expires_at TIMESTAMP NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS login_logs (
    id SERIAL PRIMARY KEY,
    username VARCHAR(255) NOT NULL,
    login_status VARCHAR(10) NOT NULL,
    os VARCHAR(100),
    browser VARCHAR(100),
    mac VARCHAR(45),
    logged_time TIMESTAMP NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS attendance_daily (
    id SERIAL PRIMARY KEY,
    employee_no VARCHAR(45) NOT NULL,
    check_in_time TIMESTAMP,
    check_in_type VARCHAR(45),
    check_out_time TIMESTAMP,
    check_out_type VARCHAR(45),
    status VARCHAR(45)
);

CREATE TABLE IF NOT EXISTS supervisor (
    id SERIAL PRIMARY KEY,
    employee_no VARCHAR(45) UNIQUE NOT NULL,
    fullname VARCHAR(255) NOT NULL,
    email VARCHAR(255),
    contact_no VARCHAR(20)
);

CREATE TABLE IF NOT EXISTS supervisor_employee_assignment (
    id SERIAL PRIMARY KEY,
    supervisor_id INTEGER NOT NULL,
    employee_no VARCHAR(45) NOT NULL
);

CREATE TABLE IF NOT EXISTS currencies (
    id SERIAL PRIMARY KEY,
    currency VARCHAR(10) NOT NULL,
    symbol VARCHAR(5) NOT NULL
);

-- Add foreign keys if not exist
DO $$
BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'fk_user_role'
    ) THEN
        ALTER TABLE app_user ADD CONSTRAINT fk_user_role
        FOREIGN KEY (user_role) REFERENCES roles(id) ON DELETE SET NULL;
    END IF;

    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'fk_employee_designation_department'
    ) THEN
        ALTER TABLE employee ADD CONSTRAINT fk_employee_designation_department
        FOREIGN KEY (department_designation_id) REFERENCES designation_department(id) ON DELETE SET NULL;
    END IF;

    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'fk_assignment_client'
    ) THEN
        ALTER TABLE employee_client_assignment ADD CONSTRAINT fk_assignment_client
        FOREIGN KEY (client_id) REFERENCES client(id) ON DELETE CASCADE;
    END IF;

    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'fk_role_permissions_role'
    ) THEN
        ALTER TABLE role_permissions ADD CONSTRAINT fk_role_permissions_role
        FOREIGN KEY (role_id) REFERENCES roles(id) ON DELETE CASCADE;
    END IF;

    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'fk_role_permissions_permission'
    ) THEN
        ALTER TABLE role_permissions ADD CONSTRAINT fk_role_permissions_permission
        FOREIGN KEY (permission_id) REFERENCES permissions(id) ON DELETE CASCADE;
    END IF;

    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'fk_checkpoint_client'
    ) THEN
        ALTER TABLE checkpoint ADD CONSTRAINT fk_checkpoint_client
        FOREIGN KEY (client_id) REFERENCES client(id) ON DELETE CASCADE;
    END IF;

    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'fk_scanned_detail_checkpoint'
    ) THEN
        ALTER TABLE scanned_detail ADD CONSTRAINT fk_scanned_detail_checkpoint
        FOREIGN KEY (checkpoint_id) REFERENCES checkpoint(id) ON DELETE CASCADE;
    END IF;

    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'fk_supervisor_assignment_supervisor'
    ) THEN
        ALTER TABLE supervisor_employee_assignment ADD CONSTRAINT fk_supervisor_assignment_supervisor
        FOREIGN KEY (supervisor_id) REFERENCES supervisor(id) ON DELETE CASCADE;
    END IF;
END $$;

-- Seed the permission catalog if not exist
INSERT INTO permissions (permission_name)
VALUES
    ('view_dashboard'),
    ('manage_employees'),
    ('manage_clients'),
    ('manage_checkpoints'),
    ('manage_users'),
    ('manage_roles'),
    ('view_attendance'),
    ('view_scan_reports')
ON CONFLICT (permission_name) DO NOTHING;

-- Seed designation/department lookup rows if the table is empty
INSERT INTO designation_department (designation, department)
SELECT v.designation, v.department
FROM (VALUES
    ('Security Officer', 'Operations'),
    ('Senior Security Officer', 'Operations'),
    ('Site Supervisor', 'Operations'),
    ('HR Executive', 'Human Resources'),
    ('Accountant', 'Finance')
) AS v(designation, department)
WHERE NOT EXISTS (SELECT 1 FROM designation_department);
"#;

// Config
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub jwt_expiry_hours: i64,
    pub refresh_expiry_days: i64,
    // Password every derived client login account starts with.
    pub client_default_password: String,
    pub qr_code_dir: String,
    pub public_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let jwt_secret = match env::var("JWT_SECRET_KEY") {
            Ok(val) => val,
            Err(e) => {
                warn!("Failed to load JWT_SECRET_KEY: {}", e);
                warn!("Using default JWT secret - THIS IS NOT SECURE FOR PRODUCTION!");
                "your_default_secret_key".to_string()
            }
        };

        let jwt_refresh_secret = match env::var("JWT_REFRESH_SECRET_KEY") {
            Ok(val) => val,
            Err(e) => {
                warn!("Failed to load JWT_REFRESH_SECRET_KEY: {}", e);
                warn!("Using default refresh secret - THIS IS NOT SECURE FOR PRODUCTION!");
                "your_refresh_secret_key".to_string()
            }
        };

        let jwt_expiry_hours = env::var("JWT_EXPIRY_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(1);

        let refresh_expiry_days = env::var("REFRESH_EXPIRY_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(7);

        let client_default_password =
            env::var("CLIENT_DEFAULT_PASSWORD").unwrap_or_else(|_| "client@123".to_string());

        let qr_code_dir =
            env::var("QR_CODE_DIR").unwrap_or_else(|_| "public/qr-codes".to_string());

        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        Self {
            jwt_secret,
            jwt_refresh_secret,
            jwt_expiry_hours,
            refresh_expiry_days,
            client_default_password,
            qr_code_dir,
            public_base_url,
        }
    }

    // An absent signing key is startup misconfiguration, not something a
    // request handler gets to recover from.
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.is_empty() || self.jwt_refresh_secret.is_empty() {
            return Err("JWT signing secrets must not be empty".to_string());
        }

        if self.jwt_secret == "your_default_secret_key" {
            warn!("Using default JWT secret is not secure for production!");
        }

        if self.jwt_expiry_hours <= 0 {
            return Err("JWT_EXPIRY_HOURS must be positive".to_string());
        }

        if self.refresh_expiry_days <= 0 {
            return Err("REFRESH_EXPIRY_DAYS must be positive".to_string());
        }

        if self.client_default_password.len() < 8 {
            return Err("CLIENT_DEFAULT_PASSWORD must be at least 8 characters".to_string());
        }

        Ok(())
    }

    pub fn generate_secure_secret() -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            jwt_secret: "access-secret".to_string(),
            jwt_refresh_secret: "refresh-secret".to_string(),
            jwt_expiry_hours: 1,
            refresh_expiry_days: 7,
            client_default_password: "client@123".to_string(),
            qr_code_dir: "public/qr-codes".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
        }
    }

    #[test]
    fn validate_accepts_sane_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_secret_and_bad_expiries() {
        let mut cfg = base_config();
        cfg.jwt_secret = String::new();
        assert!(cfg.validate().is_err());

        let mut cfg = base_config();
        cfg.jwt_expiry_hours = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = base_config();
        cfg.refresh_expiry_days = -1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn generated_secret_is_32_alphanumeric_chars() {
        let secret = AppConfig::generate_secure_secret();
        assert_eq!(secret.len(), 32);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}

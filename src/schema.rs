// Database schema definitions
diesel::table! {
    app_user (id) {
        id -> Int4,
        employee_no -> Nullable<Varchar>,
        username -> Varchar,
        password -> Varchar,
        employee_status -> Nullable<Varchar>,
        user_role -> Nullable<Int4>,
        user_type -> Varchar,
        employment -> Varchar,
    }
}

diesel::table! {
    designation_department (id) {
        id -> Int4,
        designation -> Varchar,
        department -> Varchar,
    }
}

diesel::table! {
    employee (employee_no) {
        employee_no -> Varchar,
        name -> Varchar,
        name_initial -> Nullable<Varchar>,
        calling_name -> Nullable<Varchar>,
        nic -> Nullable<Varchar>,
        date_of_birth -> Nullable<Date>,
        contact_number -> Nullable<Varchar>,
        address -> Nullable<Varchar>,
        employee_category -> Varchar,
        employee_type -> Nullable<Varchar>,
        department_designation_id -> Nullable<Int4>,
        work_location -> Nullable<Varchar>,
        active_status -> Varchar,
    }
}

diesel::table! {
    client (id) {
        id -> Int4,
        name -> Varchar,
        email -> Varchar,
        phone -> Varchar,
        address -> Nullable<Varchar>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    employee_client_assignment (id) {
        id -> Int4,
        client_id -> Int4,
        employee_no -> Varchar,
        created_at -> Timestamp,
    }
}

diesel::table! {
    roles (id) {
        id -> Int4,
        role_name -> Varchar,
        role_description -> Nullable<Varchar>,
    }
}

diesel::table! {
    permissions (id) {
        id -> Int4,
        permission_name -> Varchar,
    }
}

diesel::table! {
    role_permissions (role_id, permission_id) {
        role_id -> Int4,
        permission_id -> Int4,
    }
}

diesel::table! {
    checkpoint (id) {
        id -> Int4,
        name -> Varchar,
        client_id -> Int4,
        employee_ids -> Array<Text>,
        location_name -> Varchar,
        location_address -> Text,
        qr_code_url -> Varchar,
        created_at -> Timestamp,
    }
}

diesel::table! {
    scanned_detail (id) {
        id -> Int4,
        employee_no -> Varchar,
        checkpoint_id -> Int4,
        location_name -> Varchar,
        scan_date -> Date,
        scan_time -> Time,
        created_at -> Timestamp,
    }
}

diesel::table! {
    refresh_tokens (employee_no) {
        employee_no -> Varchar,
        token -> Varchar,
        expires_at -> Timestamp,
        created_at -> Timestamp,
    }
}

diesel::table! {
    login_logs (id) {
        id -> Int4,
        username -> Varchar,
        login_status -> Varchar,
        os -> Nullable<Varchar>,
        browser -> Nullable<Varchar>,
        mac -> Nullable<Varchar>,
        logged_time -> Timestamp,
    }
}

diesel::table! {
    attendance_daily (id) {
        id -> Int4,
        employee_no -> Varchar,
        check_in_time -> Nullable<Timestamp>,
        check_in_type -> Nullable<Varchar>,
        check_out_time -> Nullable<Timestamp>,
        check_out_type -> Nullable<Varchar>,
        status -> Nullable<Varchar>,
    }
}

diesel::table! {
    supervisor (id) {
        id -> Int4,
        employee_no -> Varchar,
        fullname -> Varchar,
        email -> Nullable<Varchar>,
        contact_no -> Nullable<Varchar>,
    }
}

diesel::table! {
    supervisor_employee_assignment (id) {
        id -> Int4,
        supervisor_id -> Int4,
        employee_no -> Varchar,
    }
}

diesel::table! {
    currencies (id) {
        id -> Int4,
        currency -> Varchar,
        symbol -> Varchar,
    }
}

diesel::joinable!(app_user -> roles (user_role));
diesel::joinable!(employee -> designation_department (department_designation_id));
diesel::joinable!(employee_client_assignment -> client (client_id));
diesel::joinable!(role_permissions -> roles (role_id));
diesel::joinable!(role_permissions -> permissions (permission_id));
diesel::joinable!(checkpoint -> client (client_id));
diesel::joinable!(scanned_detail -> checkpoint (checkpoint_id));
diesel::joinable!(supervisor_employee_assignment -> supervisor (supervisor_id));

diesel::allow_tables_to_appear_in_same_query!(
    app_user, designation_department, employee, client,
    employee_client_assignment, roles, permissions, role_permissions,
    checkpoint, scanned_detail, refresh_tokens, login_logs,
    attendance_daily, supervisor, supervisor_employee_assignment, currencies,
);

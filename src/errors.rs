use std::fmt;

#[derive(Debug, Clone)]
pub enum StatsError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    Serialization(String),
    DateParse(String),
    InvalidDateRange(String),
}

impl StatsError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            StatsError::DatabaseConfig(_) => "E001",
            StatsError::DatabaseConnection(_) => "E002",
            StatsError::DatabaseOperation(_) => "E003",
            StatsError::FileOperation(_) => "E004",
            StatsError::Validation(_) => "E005",
            StatsError::NotFound(_) => "E006",
            StatsError::Serialization(_) => "E007",
            StatsError::DateParse(_) => "E008",
            StatsError::InvalidDateRange(_) => "E009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            StatsError::DatabaseConfig(_) => "Database Configuration Error",
            StatsError::DatabaseConnection(_) => "Database Connection Error",
            StatsError::DatabaseOperation(_) => "Database Operation Error",
            StatsError::FileOperation(_) => "File Operation Error",
            StatsError::Validation(_) => "Validation Error",
            StatsError::NotFound(_) => "Resource Not Found",
            StatsError::Serialization(_) => "Serialization Error",
            StatsError::DateParse(_) => "Date Parse Error",
            StatsError::InvalidDateRange(_) => "Invalid Date Range",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            StatsError::DatabaseConfig(msg) => msg,
            StatsError::DatabaseConnection(msg) => msg,
            StatsError::DatabaseOperation(msg) => msg,
            StatsError::FileOperation(msg) => msg,
            StatsError::Validation(msg) => msg,
            StatsError::NotFound(msg) => msg,
            StatsError::Serialization(msg) => msg,
            StatsError::DateParse(msg) => msg,
            StatsError::InvalidDateRange(msg) => msg,
        }
    }

    /// 调用方输入导致的错误（日期范围、参数校验）
    ///
    /// 这是本子系统中唯一应该展示给最终用户的一类错误。
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            StatsError::Validation(_) | StatsError::DateParse(_) | StatsError::InvalidDateRange(_)
        )
    }

    /// 格式化为彩色输出（用于 CLI 错误输出）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for StatsError {}

// 便捷的构造函数
impl StatsError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        StatsError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        StatsError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        StatsError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        StatsError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        StatsError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        StatsError::NotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        StatsError::Serialization(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        StatsError::DateParse(msg.into())
    }

    pub fn invalid_date_range<T: Into<String>>(msg: T) -> Self {
        StatsError::InvalidDateRange(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for StatsError {
    fn from(err: sea_orm::DbErr) -> Self {
        StatsError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for StatsError {
    fn from(err: std::io::Error) -> Self {
        StatsError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for StatsError {
    fn from(err: serde_json::Error) -> Self {
        StatsError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for StatsError {
    fn from(err: chrono::ParseError) -> Self {
        StatsError::DateParse(err.to_string())
    }
}

impl From<anyhow::Error> for StatsError {
    fn from(err: anyhow::Error) -> Self {
        StatsError::DatabaseOperation(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;

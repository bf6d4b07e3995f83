pub mod checkout;
pub mod domain;
pub mod money;
pub mod ports;
pub mod validation;

pub use checkout::{CheckoutError, CheckoutReceipt, CheckoutRequest, CheckoutService, CheckoutStage};
pub use domain::{
    CartLine, Identity, NewOrder, NewOrderItem, NewProduct, NewUser, Order, OrderDetails,
    OrderItem, OrderStatus, PaymentMethod, Product, ProductPage, ProductQuery, ShippingInfo, User,
    UserCredentials, UserUpdate,
};
pub use ports::{
    CheckoutTransaction, DatabaseService, IssuedToken, PasswordHasher, PaymentDecline,
    PaymentReceipt, PaymentRequest, PaymentService, PortError, PortResult, TokenError,
    TokenService,
};
pub use validation::{CartValidation, LineStatus, LineValidation};

mod test_admin_endpoints;
mod test_login_flow;
mod test_request_filter;

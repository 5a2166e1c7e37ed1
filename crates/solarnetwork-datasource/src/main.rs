use solarnetwork_datasource::SolarNetworkDatasource;

#[grafana_plugin_sdk::main(services(data, diagnostics, resource), init_subscriber = true)]
async fn plugin() -> SolarNetworkDatasource {
    SolarNetworkDatasource::new()
}
